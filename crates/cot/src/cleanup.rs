//! Strips reasoning leakage from a synthesized answer before it reaches the
//! caller: `<thinking>` blocks a model may emit despite instructions not to,
//! and an "Answer:" preface some models prepend to their final line.

/// Strips `<thinking>...</thinking>` blocks (case-insensitive, possibly
/// multi-line), drops a leading "Answer:" preface, and collapses runs of
/// three or more blank lines down to two.
pub fn clean_answer(raw: &str) -> String {
    let without_thinking = strip_thinking_blocks(raw);
    let without_preface = strip_answer_preface(&without_thinking);
    collapse_blank_lines(&without_preface)
}

fn strip_thinking_blocks(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0usize;

    loop {
        let Some(start_rel) = lower[cursor..].find("<thinking>") else {
            result.push_str(&text[cursor..]);
            break;
        };
        let start = cursor + start_rel;
        result.push_str(&text[cursor..start]);

        match lower[start..].find("</thinking>") {
            Some(end_rel) => {
                cursor = start + end_rel + "</thinking>".len();
            }
            None => {
                // Unterminated block: drop the rest rather than emit a
                // partial block.
                cursor = text.len();
                break;
            }
        }
    }

    if cursor < text.len() && result.is_empty() {
        result.push_str(&text[cursor..]);
    }
    result
}

fn strip_answer_preface(text: &str) -> String {
    let trimmed = text.trim_start();
    for preface in ["Answer:", "answer:", "ANSWER:", "Final Answer:", "final answer:"] {
        if let Some(rest) = trimmed.strip_prefix(preface) {
            return rest.trim_start().to_string();
        }
    }
    trimmed.to_string()
}

fn collapse_blank_lines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.split('\n') {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 2 {
                result.push('\n');
            }
        } else {
            blank_run = 0;
            result.push_str(line);
            result.push('\n');
        }
    }

    result.trim_end_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_thinking_block() {
        let raw = "<thinking>let me work through this</thinking>The answer is 42.";
        assert_eq!(clean_answer(raw), "The answer is 42.");
    }

    #[test]
    fn strips_answer_preface() {
        let raw = "Answer: Rust is a systems language.";
        assert_eq!(clean_answer(raw), "Rust is a systems language.");
    }

    #[test]
    fn collapses_excess_blank_lines() {
        let raw = "First paragraph.\n\n\n\n\nSecond paragraph.";
        let cleaned = clean_answer(raw);
        assert_eq!(cleaned, "First paragraph.\n\n\nSecond paragraph.");
    }

    #[test]
    fn handles_combination_of_all_three() {
        let raw = "<thinking>plan it out</thinking>\n\nAnswer: Done.\n\n\n\nTrailing.";
        let cleaned = clean_answer(raw);
        assert!(!cleaned.to_lowercase().contains("thinking"));
        assert!(!cleaned.starts_with("Answer:"));
    }
}
