//! End-to-end check of the Gemini integration.
//!
//! Runs entity extraction and a general summary on a fixed consultation
//! note and exits with status 1 if either step fails.

use std::process::ExitCode;
use std::sync::Arc;

use healthcore_common::DocumentType;
use healthcore_config::Config;
use healthcore_llm::{GeminiBackend, MedicalAssistant, MedicalEntities};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SAMPLE_NOTE: &str = "\
PATIENT: John Doe, 45-year-old male
DATE: 2024-01-15

CHIEF COMPLAINT: Persistent cough and fever for 5 days

HISTORY OF PRESENT ILLNESS:
Patient reports productive cough with yellow sputum, fever up to 101.5F, and mild shortness of breath.
No recent travel. Non-smoker.

VITAL SIGNS:
BP: 130/85, HR: 92, Temp: 101.2F, RR: 20, SpO2: 95% on room air

PHYSICAL EXAMINATION:
Decreased breath sounds and crackles in the right lower lobe.

ASSESSMENT:
Community-acquired pneumonia, right lower lobe

PLAN:
1. Amoxicillin-clavulanate 875/125 mg PO BID for 7 days
2. Acetaminophen 650 mg PO Q6H PRN fever
3. Increase fluid intake
4. Follow up in 1 week or sooner if symptoms worsen
";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("healthcore=info,info")),
        )
        .init();

    match run().await {
        Ok(()) => {
            info!("Gemini smoke test passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Gemini smoke test failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    let backend = GeminiBackend::from_config(&config.llm)?;
    let assistant = MedicalAssistant::with_config(Arc::new(backend), &config.llm);
    info!(model = %assistant.model_id(), "Running smoke test");

    let entities = assistant.extract_entities(SAMPLE_NOTE).await;
    if entities == MedicalEntities::not_extracted() {
        anyhow::bail!("entity extraction returned no parseable entities");
    }
    for (label, value) in entities.rows() {
        println!("{label}: {value}");
    }

    let summary = assistant.generate_summary(SAMPLE_NOTE, DocumentType::General).await?;
    if summary.output.is_empty() {
        anyhow::bail!("summary was empty");
    }
    println!("\n{}", summary.output);
    info!(
        prompt_tokens = summary.metrics.prompt_tokens,
        completion_tokens = summary.metrics.completion_tokens,
        latency_ms = summary.metrics.latency_ms,
        "Summary generated"
    );
    Ok(())
}
