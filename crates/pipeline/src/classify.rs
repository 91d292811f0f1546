use convoy_storage::Priority;

/// Contact state handed to the classifier alongside the message content.
#[derive(Debug, Clone)]
pub struct ContactContext {
    pub lead_score: i64,
    pub lifecycle_stage: String,
}

/// Classifier verdict for one inbound message.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Raise the conversation to this priority (never lowers).
    pub escalate_to: Option<Priority>,
    /// Lead-score delta; storage clamps the result to 0–100.
    pub score_delta: i64,
    /// Labels for downstream consumers (broadcast frames, analytics sinks).
    pub tags: Vec<String>,
}

/// Stateless message classification strategy.
///
/// The pipeline holds this as a trait object, so an intent-model
/// implementation can replace the keyword baseline without touching
/// anything else.
pub trait Classifier: Send + Sync {
    fn classify(&self, content: &str, context: &ContactContext) -> Classification;
}

/// Default urgency vocabulary for [`KeywordClassifier`].
pub const DEFAULT_URGENCY_TERMS: &[&str] =
    &["urgent", "emergency", "broken", "asap", "immediately"];

/// Default lead-score step per inbound message.
pub const DEFAULT_SCORE_STEP: i64 = 5;

/// Baseline keyword classifier: urgency terms escalate the conversation to
/// high priority; every inbound message earns a fixed engagement step on the
/// contact's lead score.
pub struct KeywordClassifier {
    urgency_terms: Vec<String>,
    score_step: i64,
}

impl KeywordClassifier {
    pub fn new(urgency_terms: Vec<String>, score_step: i64) -> Self {
        Self {
            urgency_terms: urgency_terms
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            score_step,
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_URGENCY_TERMS.iter().map(|t| (*t).to_string()).collect(),
            DEFAULT_SCORE_STEP,
        )
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, content: &str, _context: &ContactContext) -> Classification {
        let lowered = content.to_lowercase();
        let tags: Vec<String> = self
            .urgency_terms
            .iter()
            .filter(|term| lowered.contains(term.as_str()))
            .cloned()
            .collect();

        Classification {
            escalate_to: if tags.is_empty() {
                None
            } else {
                Some(Priority::High)
            },
            score_delta: self.score_step,
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ContactContext {
        ContactContext {
            lead_score: 10,
            lifecycle_stage: "lead".into(),
        }
    }

    #[test]
    fn urgency_escalates() {
        let c = KeywordClassifier::default();
        let out = c.classify("This is URGENT, the checkout is broken!", &ctx());
        assert_eq!(out.escalate_to, Some(Priority::High));
        assert_eq!(out.score_delta, DEFAULT_SCORE_STEP);
        assert!(out.tags.contains(&"urgent".to_string()));
        assert!(out.tags.contains(&"broken".to_string()));
    }

    #[test]
    fn plain_message_scores_without_escalation() {
        let c = KeywordClassifier::default();
        let out = c.classify("hello, just checking in", &ctx());
        assert_eq!(out.escalate_to, None);
        assert_eq!(out.score_delta, DEFAULT_SCORE_STEP);
        assert!(out.tags.is_empty());
    }

    #[test]
    fn custom_vocabulary() {
        let c = KeywordClassifier::new(vec!["refund".into()], 10);
        let out = c.classify("I want a ReFund now", &ctx());
        assert_eq!(out.escalate_to, Some(Priority::High));
        assert_eq!(out.tags, vec!["refund".to_string()]);
    }
}
