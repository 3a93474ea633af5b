use std::sync::Arc;

use safeveto::{
    config::{AppConfig, ReportFormat},
    model::{ModelProvider, ScriptedModelProvider},
    orchestrator::{
        GuardrailResponder, SovereignResponder, StressTestOrchestrator, guardrail_policy,
        sovereign_policy,
    },
    report,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let model = build_model_provider(&config);
    if config.guardrail_blocklist.is_empty() {
        warn!("GUARDRAIL_BLOCKLIST is empty; the guardrail will release every candidate");
    }
    if config.harm_terms.is_empty() {
        warn!("HARM_TERMS is empty; the sovereign veto will never fire");
    }

    let orchestrator = StressTestOrchestrator::new(
        GuardrailResponder::new(model.clone(), guardrail_policy(&config.guardrail_blocklist)),
        SovereignResponder::new(
            model,
            sovereign_policy(&config.harm_terms),
            config.service_mode.clone(),
        ),
    );

    let report = orchestrator.run(&config.prompt).await?;
    let rendered = match config.report_format {
        ReportFormat::Text => report::render_text(&report)?,
        ReportFormat::Json => report::render_json(&report)?,
    };
    println!("{rendered}");

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn build_model_provider(config: &AppConfig) -> Arc<dyn ModelProvider> {
    if let Some(output) = config.candidate_output.clone() {
        info!("using CANDIDATE_OUTPUT as the scripted model answer");
        Arc::new(ScriptedModelProvider::new(output))
    } else {
        info!("CANDIDATE_OUTPUT not set; replaying the destructive answer");
        Arc::new(ScriptedModelProvider::default())
    }
}
