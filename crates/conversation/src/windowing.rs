//! Windowed context construction (spec §4.5): the most recent messages
//! that fit in `context_window_size` tokens, most-recent-first while
//! selecting, then reversed back to chronological order for the prompt.

use ragcore_core::ConversationMessage;
use ragcore_llm::approx_token_count;

pub fn build_windowed_context(messages: &[ConversationMessage], context_window_tokens: u32) -> Vec<ConversationMessage> {
    let mut budget = context_window_tokens;
    let mut selected = Vec::new();

    for message in messages.iter().rev() {
        let cost = approx_token_count(&message.content);
        if cost > budget && !selected.is_empty() {
            break;
        }
        selected.push(message.clone());
        budget = budget.saturating_sub(cost);
    }

    selected.reverse();
    selected
}

pub fn concatenate_context(messages: &[ConversationMessage]) -> String {
    messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::{MessageRole, MessageType};
    use serde_json::Value;
    use uuid::Uuid;

    fn message(content: &str) -> ConversationMessage {
        ConversationMessage {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role: MessageRole::User,
            message_type: MessageType::Question,
            content: content.to_string(),
            metadata: Value::Null,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn keeps_most_recent_messages_within_budget() {
        let messages = vec![message("alpha beta gamma"), message("delta epsilon"), message("zeta")];
        let windowed = build_windowed_context(&messages, 3);

        assert_eq!(windowed.len(), 2);
        assert_eq!(windowed[0].content, "delta epsilon");
        assert_eq!(windowed[1].content, "zeta");
    }

    #[test]
    fn always_keeps_at_least_the_most_recent_message() {
        let messages = vec![message("this message alone exceeds the whole tiny budget by itself")];
        let windowed = build_windowed_context(&messages, 1);
        assert_eq!(windowed.len(), 1);
    }

    #[test]
    fn preserves_chronological_order_in_output() {
        let messages = vec![message("first"), message("second"), message("third")];
        let windowed = build_windowed_context(&messages, 1000);
        let contents: Vec<&str> = windowed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }
}
