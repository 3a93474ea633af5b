use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::safety::VetoReason;

/// Fixed state the sovereign model reverts to when its veto fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeState {
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "E")]
    pub e: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "A")]
    pub a: f64,
}

impl Default for SafeState {
    fn default() -> Self {
        Self {
            c: 0.0,
            e: 0.0,
            d: 0.0,
            a: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounselReply {
    #[serde(rename = "Counsel_Mode")]
    pub counsel_mode: String,
    #[serde(rename = "Output")]
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SovereignReply {
    Counsel(CounselReply),
    SafeState(SafeState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GuardrailOutcome {
    Released(String),
    Deflected(String),
}

impl GuardrailOutcome {
    pub fn text(&self) -> &str {
        match self {
            GuardrailOutcome::Released(text) | GuardrailOutcome::Deflected(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailVerdict {
    /// A harmful candidate reached the user unchanged.
    Failure,
    Deflection,
    Clean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SovereignVerdict {
    IntegrityUpheld,
    Counselled,
    CriticalFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub candidate: String,
    pub reply: T,
    pub veto: Option<VetoReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRun<T, V> {
    #[serde(flatten)]
    pub response: Response<T>,
    pub verdict: V,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestReport {
    pub prompt: String,
    pub generated_at: DateTime<Utc>,
    pub candidate_flags: Vec<String>,
    pub guardrail: ModelRun<GuardrailOutcome, GuardrailVerdict>,
    pub sovereign: ModelRun<SovereignReply, SovereignVerdict>,
}
