//! Usage-threshold evaluation (spec §4.7). Stateless: callers own usage
//! history and context-window lookup, `TokenTracker` only turns numbers
//! into warnings.

use ragcore_core::TokenUsage;

use crate::warning::{Severity, TokenWarning, WarningKind};

pub const DEFAULT_CONTEXT_WINDOW: u32 = 4096;

const AT_LIMIT_THRESHOLD: f64 = 95.0;
const APPROACHING_LIMIT_THRESHOLD: f64 = 85.0;
const INFO_THRESHOLD: f64 = 70.0;
const CONVERSATION_THRESHOLD: f64 = 80.0;
const CONVERSATION_CRITICAL_THRESHOLD: f64 = 95.0;
const RECENT_MESSAGE_WINDOW: usize = 5;

#[derive(Default)]
pub struct TokenTracker;

impl TokenTracker {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates one LLM call's usage against `context_limit`, emitting at
    /// most one warning, escalating by percentage of window consumed.
    /// `context_tokens` overrides `usage.prompt_tokens` as the quantity
    /// checked, for callers that already know the full prompt size
    /// (including retrieved context) rather than just what the provider
    /// reported back.
    pub fn check_usage_warning(
        &self,
        usage: &TokenUsage,
        context_limit: u32,
        context_tokens: Option<u32>,
    ) -> Option<TokenWarning> {
        let checked = context_tokens.unwrap_or(usage.prompt_tokens);
        let percentage = percentage_of(checked, context_limit);

        if percentage >= AT_LIMIT_THRESHOLD {
            Some(TokenWarning::new(
                WarningKind::AtLimit,
                checked,
                context_limit,
                percentage,
                Severity::Critical,
                format!("Context window is {percentage:.0}% full."),
                Some("start_new_session"),
            ))
        } else if percentage >= APPROACHING_LIMIT_THRESHOLD {
            Some(TokenWarning::new(
                WarningKind::ApproachingLimit,
                checked,
                context_limit,
                percentage,
                Severity::Warning,
                format!("Context window is {percentage:.0}% full."),
                Some("consider_new_session"),
            ))
        } else if percentage >= INFO_THRESHOLD {
            Some(TokenWarning::new(
                WarningKind::ApproachingLimit,
                checked,
                context_limit,
                percentage,
                Severity::Info,
                format!("Context window is {percentage:.0}% full."),
                None,
            ))
        } else {
            None
        }
    }

    /// Sums prompt tokens over the last 5 usage samples; warns if they
    /// exceed 80% of the window, at `warning` or `critical` severity
    /// depending on how far over.
    pub fn check_conversation_warning(
        &self,
        session_usage_history: &[TokenUsage],
        context_limit: u32,
    ) -> Option<TokenWarning> {
        if session_usage_history.is_empty() {
            return None;
        }

        let recent = &session_usage_history[session_usage_history.len().saturating_sub(RECENT_MESSAGE_WINDOW)..];
        let recent_prompt_tokens: u32 = recent.iter().map(|u| u.prompt_tokens).sum();
        let percentage = percentage_of(recent_prompt_tokens, context_limit);

        if percentage <= CONVERSATION_THRESHOLD {
            return None;
        }

        let severity = if percentage < CONVERSATION_CRITICAL_THRESHOLD { Severity::Warning } else { Severity::Critical };

        Some(TokenWarning::new(
            WarningKind::ConversationTooLong,
            recent_prompt_tokens,
            context_limit,
            percentage,
            severity,
            "Conversation context is getting large. Older messages may be excluded from context.",
            Some("start_new_session"),
        ))
    }
}

fn percentage_of(tokens: u32, limit: u32) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    (tokens as f64 / limit as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt_tokens: u32) -> TokenUsage {
        TokenUsage { prompt_tokens, completion_tokens: 0 }
    }

    #[test]
    fn below_info_threshold_emits_nothing() {
        let tracker = TokenTracker::new();
        assert!(tracker.check_usage_warning(&usage(100), 1000, None).is_none());
    }

    #[test]
    fn info_threshold_escalation() {
        let tracker = TokenTracker::new();
        let warning = tracker.check_usage_warning(&usage(720), 1000, None).unwrap();
        assert_eq!(warning.severity, Severity::Info);
        assert!(warning.suggested_action.is_none());
    }

    #[test]
    fn warning_threshold_escalation() {
        let tracker = TokenTracker::new();
        let warning = tracker.check_usage_warning(&usage(860), 1000, None).unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.suggested_action.as_deref(), Some("consider_new_session"));
    }

    #[test]
    fn critical_threshold_escalation_and_percentage_cap() {
        let tracker = TokenTracker::new();
        let warning = tracker.check_usage_warning(&usage(960), 1000, None).unwrap();
        assert_eq!(warning.severity, Severity::Critical);
        assert_eq!(warning.suggested_action.as_deref(), Some("start_new_session"));

        let capped = tracker.check_usage_warning(&usage(5000), 1000, None).unwrap();
        assert_eq!(capped.percentage, 100.0);
    }

    #[test]
    fn context_tokens_override_takes_precedence_over_prompt_tokens() {
        let tracker = TokenTracker::new();
        let warning = tracker.check_usage_warning(&usage(100), 1000, Some(960)).unwrap();
        assert_eq!(warning.severity, Severity::Critical);
    }

    #[test]
    fn conversation_warning_only_considers_last_five_messages() {
        let tracker = TokenTracker::new();
        let mut history = vec![usage(1000); 10];
        history.extend(vec![usage(10); 5]);
        assert!(tracker.check_conversation_warning(&history, 1000).is_none());
    }

    #[test]
    fn conversation_warning_escalates_to_critical_past_ninety_five_percent() {
        let tracker = TokenTracker::new();
        let history = vec![usage(200); 5];
        let warning = tracker.check_conversation_warning(&history, 1000).unwrap();
        assert_eq!(warning.severity, Severity::Critical);
    }

    #[test]
    fn conversation_warning_empty_history_is_none() {
        let tracker = TokenTracker::new();
        assert!(tracker.check_conversation_warning(&[], 1000).is_none());
    }
}
