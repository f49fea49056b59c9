//! Decomposes a complex question into sub-questions, answers each through a
//! caller-supplied retrieval+generation step, and synthesizes a final
//! answer from the ordered `(sub-question, sub-answer)` pairs.

use std::future::Future;
use std::sync::Arc;

use ragcore_core::traits::{GenerationParams, LlmProvider};
use serde::{Deserialize, Serialize};

use crate::cleanup::clean_answer;
use crate::error::CotError;
use crate::heuristic::{ComplexityHeuristic, DefaultComplexityHeuristic};

pub const DEFAULT_MAX_SUB_QUESTIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestionAnswer {
    pub question: String,
    pub answer: String,
}

pub struct ChainOfThoughtEngine {
    llm: Arc<dyn LlmProvider>,
    heuristic: Box<dyn ComplexityHeuristic>,
    max_sub_questions: usize,
}

impl ChainOfThoughtEngine {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            heuristic: Box::new(DefaultComplexityHeuristic::default()),
            max_sub_questions: DEFAULT_MAX_SUB_QUESTIONS,
        }
    }

    pub fn with_heuristic(mut self, heuristic: Box<dyn ComplexityHeuristic>) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_max_sub_questions(mut self, max: usize) -> Self {
        self.max_sub_questions = max.min(DEFAULT_MAX_SUB_QUESTIONS).max(1);
        self
    }

    pub fn should_engage(&self, question: &str, requested: bool) -> bool {
        self.heuristic.should_decompose(question, requested)
    }

    /// Asks the model to break `question` into an ordered list of
    /// sub-questions, bounded to `max_sub_questions`. Parses a numbered or
    /// hyphenated list out of free text rather than requiring a schema,
    /// since decomposition quality matters more than strict JSON shape here.
    pub async fn decompose(&self, question: &str) -> Result<Vec<String>, CotError> {
        let prompt = format!(
            "Break the following question into at most {} simpler sub-questions \
             that together cover everything needed to answer it. Respond with \
             one sub-question per line, numbered.\n\nQuestion: {question}",
            self.max_sub_questions
        );

        let (raw, _usage) = self
            .llm
            .generate(&prompt, &GenerationParams::default())
            .await
            .map_err(|e| CotError::SubStepFailed(e.to_string()))?;

        let sub_questions = parse_numbered_list(&raw, self.max_sub_questions);
        if sub_questions.is_empty() {
            return Err(CotError::EmptyDecomposition);
        }
        Ok(sub_questions)
    }

    /// Runs the full decompose → answer-each → synthesize flow. `answer_sub_question`
    /// performs the pipeline's retrieval+generation sub-steps for a single
    /// sub-question, given the concatenated prior sub-answers as extra context.
    pub async fn run<F, Fut>(&self, question: &str, mut answer_sub_question: F) -> Result<String, CotError>
    where
        F: FnMut(String, String) -> Fut,
        Fut: Future<Output = Result<String, CotError>>,
    {
        let sub_questions = self.decompose(question).await?;

        let mut history = Vec::with_capacity(sub_questions.len());
        let mut prior_context = String::new();

        for sub_question in sub_questions {
            let answer = answer_sub_question(sub_question.clone(), prior_context.clone()).await?;
            prior_context.push_str(&format!("Q: {sub_question}\nA: {answer}\n\n"));
            history.push(SubQuestionAnswer { question: sub_question, answer });
        }

        self.synthesize(question, &history).await
    }

    async fn synthesize(&self, question: &str, history: &[SubQuestionAnswer]) -> Result<String, CotError> {
        let pairs = history
            .iter()
            .enumerate()
            .map(|(i, pair)| format!("{}. Q: {}\n   A: {}", i + 1, pair.question, pair.answer))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Original question: {question}\n\n\
             Sub-questions and their answers, in order:\n{pairs}\n\n\
             Using only the information above, write the final answer to the \
             original question. Do not include your reasoning, only the answer."
        );

        let (raw, _usage) = self
            .llm
            .generate(&prompt, &GenerationParams::default())
            .await
            .map_err(|e| CotError::SubStepFailed(e.to_string()))?;

        Ok(clean_answer(&raw))
    }
}

fn parse_numbered_list(text: &str, max_items: usize) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let without_marker = trimmed
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches('.')
                .trim_start_matches(')')
                .trim_start_matches('-')
                .trim_start_matches('*')
                .trim();
            if without_marker.is_empty() { None } else { Some(without_marker.to_string()) }
        })
        .take(max_items)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_list_with_mixed_markers() {
        let text = "1. What is Rust?\n2) Why use it?\n- How fast is it?\n";
        let items = parse_numbered_list(text, 5);
        assert_eq!(items, vec!["What is Rust?", "Why use it?", "How fast is it?"]);
    }

    #[test]
    fn parse_numbered_list_respects_max_items() {
        let text = "1. one\n2. two\n3. three\n4. four\n";
        let items = parse_numbered_list(text, 2);
        assert_eq!(items.len(), 2);
    }
}
