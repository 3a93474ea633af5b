use std::env;

use crate::orchestrator::{
    DEFAULT_SERVICE_MODE, DIGITAL_RUIN_PROMPT, default_guardrail_terms, default_harm_terms,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!(
                "unsupported REPORT_FORMAT `{other}` (expected `text` or `json`)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub prompt: String,
    pub candidate_output: Option<String>,
    pub guardrail_blocklist: Vec<String>,
    pub harm_terms: Vec<String>,
    pub service_mode: String,
    pub report_format: ReportFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let report_format = ReportFormat::parse(&lookup("REPORT_FORMAT").unwrap_or_default())?;

        Ok(Self {
            prompt: non_empty(lookup("PROMPT")).unwrap_or_else(|| DIGITAL_RUIN_PROMPT.to_owned()),
            candidate_output: non_empty(lookup("CANDIDATE_OUTPUT")),
            guardrail_blocklist: lookup("GUARDRAIL_BLOCKLIST")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(default_guardrail_terms),
            harm_terms: lookup("HARM_TERMS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(default_harm_terms),
            service_mode: non_empty(lookup("SERVICE_MODE"))
                .unwrap_or_else(|| DEFAULT_SERVICE_MODE.to_owned()),
            report_format,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
