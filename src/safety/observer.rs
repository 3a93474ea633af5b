use tracing::{info, warn};

use super::{DecisionKind, VetoReason};

#[derive(Debug, Clone, Copy)]
pub struct DecisionEvent<'a> {
    pub policy: &'a str,
    pub kind: DecisionKind,
    pub candidate_len: usize,
    pub reason: Option<&'a VetoReason>,
}

impl DecisionEvent<'_> {
    /// Identity of the first predicate that fired, if the candidate was vetoed.
    pub fn predicate(&self) -> Option<&str> {
        self.reason.map(VetoReason::predicate)
    }
}

pub trait VetoObserver: Send + Sync {
    fn on_decision(&self, event: &DecisionEvent<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VetoObserver for TracingObserver {
    fn on_decision(&self, event: &DecisionEvent<'_>) {
        match event.reason {
            None => info!(
                policy = event.policy,
                kind = event.kind.as_str(),
                candidate_len = event.candidate_len,
                "candidate passed veto"
            ),
            Some(VetoReason::Violation { predicate }) => warn!(
                policy = event.policy,
                predicate = %predicate,
                "candidate vetoed; substituting fallback"
            ),
            Some(VetoReason::EvaluationFailure { predicate, error }) => warn!(
                policy = event.policy,
                predicate = %predicate,
                %error,
                "predicate failed; vetoing candidate"
            ),
        }
    }
}
