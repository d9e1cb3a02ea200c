//! The single turn-handling seam the orchestrator talks to.

use crate::assistant::AssistantPolicy;
use crate::keyword::KeywordPolicy;
use chrono::NaiveDateTime;
use parlor_types::{CallSession, TurnOutcome};

/// Hard fallback so the caller never hears silence, even if a policy
/// produces blank text.
const EMPTY_REPLY_LINE: &str =
    "I'm sorry, could you say that again? I want to make sure I get it right.";

/// One of the two interchangeable conversation strategies, chosen by
/// configuration at startup.
#[derive(Debug, Clone)]
pub enum ConversationPolicy {
    Keyword(KeywordPolicy),
    Assistant(AssistantPolicy),
}

impl ConversationPolicy {
    /// Runs one conversation turn. Guarantees exactly one reply per
    /// utterance and that the reply text is never empty.
    pub async fn handle_turn(
        &self,
        session: &mut CallSession,
        utterance: &str,
        now: NaiveDateTime,
    ) -> TurnOutcome {
        let mut outcome = match self {
            ConversationPolicy::Keyword(policy) => {
                policy.handle_turn(session, utterance, now).await
            }
            ConversationPolicy::Assistant(policy) => {
                policy.handle_turn(session, utterance, now).await
            }
        };
        if outcome.reply.trim().is_empty() {
            outcome.reply = EMPTY_REPLY_LINE.to_string();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_calendar::{CalendarClient, CalendarConfig};
    use std::sync::Arc;

    #[tokio::test]
    async fn keyword_policy_is_reachable_through_the_seam() {
        let policy = ConversationPolicy::Keyword(KeywordPolicy::new(Arc::new(
            CalendarClient::new(CalendarConfig::default()),
        )));
        let mut session = CallSession::new("CA1");
        let outcome = policy
            .handle_turn(
                &mut session,
                "what are your hours?",
                "2026-08-25T10:00:00".parse().unwrap(),
            )
            .await;
        assert!(!outcome.end_call);
        assert!(!outcome.reply.is_empty());
    }
}
