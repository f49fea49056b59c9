//! Prompt building for the RAG and question-generation templates.

use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Builds the final RAG prompt from a question, ordered context chunks, and
/// optional conversation history. Context chunks are passed in the
/// retriever's final order (spec §4.1 Generation contract: deterministic
/// chunk ordering).
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    system: Option<String>,
    history: Vec<Message>,
    context_chunks: Vec<String>,
    question: String,
}

impl PromptBuilder {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            context_chunks: Vec::new(),
            question: question.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_context(mut self, chunks: Vec<String>) -> Self {
        self.context_chunks = chunks;
        self
    }

    pub fn build(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(Message { role: Role::System, content: system.clone() });
        }
        messages.extend(self.history.iter().cloned());

        let context = if self.context_chunks.is_empty() {
            String::new()
        } else {
            let joined = self
                .context_chunks
                .iter()
                .enumerate()
                .map(|(i, c)| format!("[{}] {}", i + 1, c))
                .collect::<Vec<_>>()
                .join("\n\n");
            format!("Context:\n{joined}\n\n")
        };

        messages.push(Message {
            role: Role::User,
            content: format!("{context}Question: {}", self.question),
        });
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_preserves_context_order() {
        let prompt = PromptBuilder::new("Who created Python?")
            .with_context(vec!["chunk one".into(), "chunk two".into()])
            .build();
        let user_msg = prompt.last().unwrap();
        let idx_one = user_msg.content.find("chunk one").unwrap();
        let idx_two = user_msg.content.find("chunk two").unwrap();
        assert!(idx_one < idx_two);
    }
}
