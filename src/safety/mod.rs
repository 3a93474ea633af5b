//! Output-safety veto: release a candidate text, or substitute a fixed
//! fallback when any forbidden-content predicate fires.
//!
//! Predicate failures (errors and panics) resolve to a veto. They are never
//! returned to the caller.

mod observer;
mod predicate;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

pub use observer::{DecisionEvent, TracingObserver, VetoObserver};
pub use predicate::{Blocklist, ContainsTerm, FnPredicate, PatternPredicate, Predicate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Decision<F> {
    Passed(String),
    Vetoed(F),
}

impl<F> Decision<F> {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Passed(_) => DecisionKind::Passed,
            Decision::Vetoed(_) => DecisionKind::Vetoed,
        }
    }

    pub fn is_vetoed(&self) -> bool {
        matches!(self, Decision::Vetoed(_))
    }

    pub fn passed(&self) -> Option<&str> {
        match self {
            Decision::Passed(candidate) => Some(candidate),
            Decision::Vetoed(_) => None,
        }
    }

    pub fn vetoed(&self) -> Option<&F> {
        match self {
            Decision::Passed(_) => None,
            Decision::Vetoed(fallback) => Some(fallback),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Passed,
    Vetoed,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::Passed => "passed",
            DecisionKind::Vetoed => "vetoed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum VetoReason {
    Violation { predicate: String },
    EvaluationFailure { predicate: String, error: String },
}

impl VetoReason {
    pub fn predicate(&self) -> &str {
        match self {
            VetoReason::Violation { predicate } => predicate,
            VetoReason::EvaluationFailure { predicate, .. } => predicate,
        }
    }
}

/// A decision together with the first predicate that fired, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict<F> {
    pub decision: Decision<F>,
    pub reason: Option<VetoReason>,
}

/// Release `candidate`, or return a clone of `fallback` as soon as one of
/// `predicates` reports a violation or fails.
pub fn evaluate<'p, F, I, P>(candidate: &str, predicates: I, fallback: &F) -> Decision<F>
where
    F: Clone,
    I: IntoIterator<Item = &'p P>,
    P: Predicate + ?Sized + 'p,
{
    evaluate_detailed(candidate, predicates, fallback).decision
}

pub fn evaluate_detailed<'p, F, I, P>(candidate: &str, predicates: I, fallback: &F) -> Verdict<F>
where
    F: Clone,
    I: IntoIterator<Item = &'p P>,
    P: Predicate + ?Sized + 'p,
{
    for predicate in predicates {
        let reason = match run_predicate(predicate, candidate) {
            Ok(false) => continue,
            Ok(true) => VetoReason::Violation {
                predicate: predicate.name().to_owned(),
            },
            Err(error) => VetoReason::EvaluationFailure {
                predicate: predicate.name().to_owned(),
                error,
            },
        };
        return Verdict {
            decision: Decision::Vetoed(fallback.clone()),
            reason: Some(reason),
        };
    }

    Verdict {
        decision: Decision::Passed(candidate.to_owned()),
        reason: None,
    }
}

fn run_predicate<P>(predicate: &P, candidate: &str) -> Result<bool, String>
where
    P: Predicate + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| predicate.violates(candidate))) {
        Ok(Ok(violates)) => Ok(violates),
        Ok(Err(error)) => Err(format!("{error:#}")),
        Err(payload) => Err(panic_message(&*payload)),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_owned()
    }
}

/// A named veto policy: ordered predicates, one fallback, an optional observer.
pub struct SafetyPolicy<F> {
    name: String,
    predicates: Vec<Arc<dyn Predicate>>,
    fallback: F,
    observer: Option<Arc<dyn VetoObserver>>,
}

impl<F: Clone> SafetyPolicy<F> {
    pub fn new(name: impl Into<String>, fallback: F) -> Self {
        Self {
            name: name.into(),
            predicates: Vec::new(),
            fallback,
            observer: None,
        }
    }

    pub fn with_predicate(self, predicate: impl Predicate + 'static) -> Self {
        self.with_shared_predicate(Arc::new(predicate))
    }

    pub fn with_shared_predicate(mut self, predicate: Arc<dyn Predicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn VetoObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    pub fn predicate_names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    pub fn evaluate(&self, candidate: &str) -> Decision<F> {
        self.evaluate_detailed(candidate).decision
    }

    pub fn evaluate_detailed(&self, candidate: &str) -> Verdict<F> {
        let verdict = evaluate_detailed(
            candidate,
            self.predicates.iter().map(|p| &**p),
            &self.fallback,
        );

        if let Some(observer) = &self.observer {
            observer.on_decision(&DecisionEvent {
                policy: &self.name,
                kind: verdict.decision.kind(),
                candidate_len: candidate.len(),
                reason: verdict.reason.as_ref(),
            });
        }

        verdict
    }

    /// Runs every predicate without short-circuiting and lists the ones that
    /// fired. Failing predicates are listed as `<name>:error`.
    pub fn flags(&self, text: &str) -> Vec<String> {
        self.predicates
            .iter()
            .filter_map(|predicate| match run_predicate(&**predicate, text) {
                Ok(true) => Some(predicate.name().to_owned()),
                Ok(false) => None,
                Err(_) => Some(format!("{}:error", predicate.name())),
            })
            .collect()
    }
}

impl<F: fmt::Debug> fmt::Debug for SafetyPolicy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyPolicy")
            .field("name", &self.name)
            .field(
                "predicates",
                &self.predicates.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    use super::{
        ContainsTerm, Decision, DecisionEvent, DecisionKind, FnPredicate, Predicate,
        SafetyPolicy, TracingObserver, VetoObserver, VetoReason, evaluate, evaluate_detailed,
    };

    const FALLBACK: &str = "fallback";

    fn fallback() -> String {
        FALLBACK.to_owned()
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<(DecisionKind, Option<String>)>>,
    }

    impl VetoObserver for RecordingObserver {
        fn on_decision(&self, event: &DecisionEvent<'_>) {
            self.events
                .lock()
                .expect("observer lock")
                .push((event.kind, event.predicate().map(str::to_owned)));
        }
    }

    #[test]
    fn empty_predicates_always_pass() {
        let none: &[ContainsTerm] = &[];
        assert_eq!(
            evaluate("hello world", none, &fallback()),
            Decision::Passed("hello world".to_owned())
        );
        assert_eq!(
            evaluate("", none, &fallback()),
            Decision::Passed(String::new())
        );
    }

    #[test]
    fn firing_predicate_returns_fallback() {
        let predicates = [ContainsTerm::new("disappear")];
        assert_eq!(
            evaluate("must disappear", &predicates, &fallback()),
            Decision::Vetoed(fallback())
        );
    }

    #[test]
    fn passes_when_no_predicate_fires() {
        let predicates = [ContainsTerm::new("disappear"), ContainsTerm::new("destroy")];
        assert_eq!(
            evaluate("safe text", &predicates, &fallback()),
            Decision::Passed("safe text".to_owned())
        );
    }

    #[test]
    fn any_firing_predicate_in_sequence_vetoes() {
        let predicates = [
            ContainsTerm::new("disappear"),
            ContainsTerm::new("destroy"),
            ContainsTerm::new("ruin"),
        ];
        let verdict = evaluate_detailed("this will ruin you", &predicates, &fallback());
        assert_eq!(verdict.decision, Decision::Vetoed(fallback()));
        assert_eq!(
            verdict.reason,
            Some(VetoReason::Violation {
                predicate: "contains:ruin".to_owned()
            })
        );
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let predicates = [ContainsTerm::new("destroy")];
        for candidate in ["destroy it", "keep it", ""] {
            assert_eq!(
                evaluate(candidate, &predicates, &fallback()),
                evaluate(candidate, &predicates, &fallback())
            );
        }
    }

    #[test]
    fn stops_at_first_violation() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = second_calls.clone();
        let predicates: Vec<Box<dyn Predicate>> = vec![
            Box::new(ContainsTerm::new("disappear")),
            Box::new(FnPredicate::new("must_not_run", move |_: &str| -> anyhow::Result<bool> {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("second predicate should never be invoked")
            })),
        ];

        let verdict = evaluate_detailed(
            "must disappear",
            predicates.iter().map(|p| &**p),
            &fallback(),
        );
        assert_eq!(verdict.decision, Decision::Vetoed(fallback()));
        assert_eq!(
            verdict.reason,
            Some(VetoReason::Violation {
                predicate: "contains:disappear".to_owned()
            })
        );
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_predicate_fails_closed() {
        let predicates = [FnPredicate::new("requires_ascii", |text: &str| -> anyhow::Result<bool> {
            if !text.is_ascii() {
                anyhow::bail!("malformed input");
            }
            Ok(false)
        })];

        let verdict = evaluate_detailed("caf\u{e9}", &predicates, &fallback());
        assert_eq!(verdict.decision, Decision::Vetoed(fallback()));
        match verdict.reason {
            Some(VetoReason::EvaluationFailure { predicate, error }) => {
                assert_eq!(predicate, "requires_ascii");
                assert!(error.contains("malformed input"));
            }
            other => panic!("expected evaluation failure, got {other:?}"),
        }
    }

    #[test]
    fn panicking_predicate_fails_closed() {
        let predicates = [FnPredicate::new("explodes", |_: &str| -> anyhow::Result<bool> {
            panic!("boom")
        })];

        let verdict = evaluate_detailed("anything", &predicates, &fallback());
        assert_eq!(verdict.decision, Decision::Vetoed(fallback()));
        match verdict.reason {
            Some(VetoReason::EvaluationFailure { error, .. }) => {
                assert!(error.contains("boom"));
            }
            other => panic!("expected evaluation failure, got {other:?}"),
        }
    }

    #[test]
    fn policy_notifies_observer_once_per_call() {
        let observer = Arc::new(RecordingObserver::default());
        let policy = SafetyPolicy::new("test", fallback())
            .with_predicate(ContainsTerm::new("disappear"))
            .with_predicate(ContainsTerm::new("destroy"))
            .with_observer(observer.clone());

        assert_eq!(
            policy.evaluate("safe text"),
            Decision::Passed("safe text".to_owned())
        );
        assert_eq!(policy.evaluate("destroy it"), Decision::Vetoed(fallback()));

        let events = observer.events.lock().expect("observer lock");
        assert_eq!(
            *events,
            vec![
                (DecisionKind::Passed, None),
                (DecisionKind::Vetoed, Some("contains:destroy".to_owned())),
            ]
        );
    }

    #[test]
    fn observer_sees_failing_predicate_name() {
        let observer = Arc::new(RecordingObserver::default());
        let policy = SafetyPolicy::new("strict", fallback())
            .with_predicate(ContainsTerm::new("destroy"))
            .with_predicate(FnPredicate::new(
                "requires_ascii",
                |text: &str| -> anyhow::Result<bool> {
                    if !text.is_ascii() {
                        anyhow::bail!("malformed input");
                    }
                    Ok(false)
                },
            ))
            .with_observer(observer.clone());

        assert_eq!(policy.evaluate("caf\u{e9}"), Decision::Vetoed(fallback()));

        let events = observer.events.lock().expect("observer lock");
        assert_eq!(
            *events,
            vec![(DecisionKind::Vetoed, Some("requires_ascii".to_owned()))]
        );
    }

    #[test]
    fn tracing_observer_handles_every_outcome() {
        let policy = SafetyPolicy::new("traced", fallback())
            .with_predicate(FnPredicate::new(
                "rejects_empty",
                |text: &str| -> anyhow::Result<bool> {
                    if text.is_empty() {
                        anyhow::bail!("empty candidate");
                    }
                    Ok(false)
                },
            ))
            .with_predicate(ContainsTerm::new("destroy"))
            .with_observer(Arc::new(TracingObserver));

        assert_eq!(policy.evaluate("calm"), Decision::Passed("calm".to_owned()));
        assert_eq!(policy.evaluate("destroy"), Decision::Vetoed(fallback()));
        let verdict = policy.evaluate_detailed("");
        assert_eq!(verdict.decision, Decision::Vetoed(fallback()));
        assert_eq!(
            verdict.reason.as_ref().map(VetoReason::predicate),
            Some("rejects_empty")
        );
    }

    #[test]
    fn policy_is_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SafetyPolicy<String>>();

        let policy = Arc::new(
            SafetyPolicy::new("shared", fallback())
                .with_predicate(ContainsTerm::new("destroy"))
                .with_observer(Arc::new(TracingObserver)),
        );

        let workers = (0..8)
            .map(|index| {
                let policy = policy.clone();
                thread::spawn(move || {
                    let candidate = if index % 2 == 0 { "destroy it" } else { "ok" };
                    (index, policy.evaluate(candidate))
                })
            })
            .collect::<Vec<_>>();

        for worker in workers {
            let (index, decision) = worker.join().expect("worker should not panic");
            if index % 2 == 0 {
                assert_eq!(decision, Decision::Vetoed(fallback()));
            } else {
                assert_eq!(decision, Decision::Passed("ok".to_owned()));
            }
        }
    }

    #[test]
    fn policies_are_independent() {
        let refusal = SafetyPolicy::new("refusal", "no".to_owned())
            .with_predicate(ContainsTerm::new("disappear"));
        let numeric =
            SafetyPolicy::new("numeric", 0_u8).with_predicate(ContainsTerm::new("destroy"));

        assert_eq!(
            refusal.evaluate("destroy"),
            Decision::Passed("destroy".to_owned())
        );
        assert_eq!(numeric.evaluate("destroy"), Decision::Vetoed(0));
        assert_eq!(refusal.predicate_names(), vec!["contains:disappear"]);
    }

    #[test]
    fn flags_run_every_predicate() {
        let policy = SafetyPolicy::new("audit", fallback())
            .with_predicate(ContainsTerm::new("disappear"))
            .with_predicate(FnPredicate::new("broken", |_: &str| -> anyhow::Result<bool> {
                anyhow::bail!("unavailable")
            }))
            .with_predicate(ContainsTerm::new("destroy"));

        assert_eq!(
            policy.flags("Destroy and disappear"),
            vec!["contains:disappear", "broken:error", "contains:destroy"]
        );
    }

    #[test]
    fn decision_accessors_expose_one_branch() {
        let passed: Decision<String> = Decision::Passed("hello".to_owned());
        assert_eq!(passed.passed(), Some("hello"));
        assert!(passed.vetoed().is_none());
        assert!(!passed.is_vetoed());

        let vetoed: Decision<String> = Decision::Vetoed(fallback());
        assert_eq!(vetoed.vetoed().map(String::as_str), Some(FALLBACK));
        assert_eq!(vetoed.kind().as_str(), "vetoed");
    }

    #[test]
    fn decision_serializes_as_tagged_value() {
        let passed: Decision<String> = Decision::Passed("hello".to_owned());
        let vetoed: Decision<String> = Decision::Vetoed(fallback());

        assert_eq!(
            serde_json::to_value(&passed).expect("serialize"),
            serde_json::json!({"kind": "passed", "value": "hello"})
        );
        assert_eq!(
            serde_json::to_value(&vetoed).expect("serialize"),
            serde_json::json!({"kind": "vetoed", "value": "fallback"})
        );
    }
}
