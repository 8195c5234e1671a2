use std::time::Instant;

use opentelemetry::KeyValue;

use crate::config::Config;
use crate::db::{NewSubmission, SubmissionStore};
use crate::error::AppError;
use crate::llm::{GenerateRequest, LlmClient};
use crate::models::{FormSubmission, Report};
use crate::telemetry::metrics::{
    REPORT_GENERATION_DURATION, REPORT_HEALTH_SCORE, REPORT_PERSISTENCE_FAILURES,
    REPORT_RED_FLAG_SEVERITY, REPORT_RED_FLAGS,
};

use super::{assemble, extract, prompt, sanitize};

/// Per-call knobs for the generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub web_search_max_uses: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm_model.clone(),
            max_tokens: config.llm_max_tokens,
            web_search_max_uses: config.web_search_max_uses,
        }
    }
}

/// Runs the whole chain for one questionnaire: prompt, generation, extraction,
/// sanitization and assembly, then hands the report to the store.
///
/// Storage is best-effort. A failed insert is logged and counted but the report is
/// still returned.
#[tracing::instrument(
    name = "pipeline report",
    skip_all,
    fields(
        report.subject = %submission.input().company_name(),
        report.industry = %submission.input().resolved_industry(),
        report.health_score,
        report.red_flags,
        report.duration_ms,
        report.persisted,
    )
)]
pub async fn generate_report(
    llm_client: &LlmClient,
    settings: &GenerationSettings,
    store: Option<&dyn SubmissionStore>,
    submission: &FormSubmission,
) -> Result<Report, AppError> {
    let start = Instant::now();
    let span = tracing::Span::current();
    let input = submission.input();

    let prompts = prompt::build(input);

    let request = GenerateRequest {
        model: settings.model.clone(),
        system: prompts.system,
        prompt: prompts.user,
        max_tokens: settings.max_tokens,
        web_search_max_uses: Some(settings.web_search_max_uses),
        stage: "diagnose".to_string(),
    };

    let response = llm_client.generate(&request).await?;

    let body = extract::extract(&response.content)?;
    let body = sanitize::sanitize(body);
    let report = assemble::assemble(body, input);

    let persisted = match store {
        Some(store) => persist(store, submission, &report).await,
        None => {
            tracing::debug!("No submission store configured, skipping persistence");
            false
        }
    };

    let duration = start.elapsed();
    let band = KeyValue::new("report.health_band", report.health_band().label());

    REPORT_GENERATION_DURATION.record(duration.as_secs_f64(), &[band.clone()]);
    REPORT_HEALTH_SCORE.record(f64::from(report.health_score().value()), &[band.clone()]);
    REPORT_RED_FLAGS.record(report.body().red_flags.len() as f64, &[band]);
    for flag in &report.body().red_flags {
        REPORT_RED_FLAG_SEVERITY.add(
            1,
            &[KeyValue::new("report.red_flag.severity", flag.severity.label())],
        );
    }

    span.record("report.health_score", report.health_score().value());
    span.record("report.red_flags", report.body().red_flags.len());
    span.record("report.duration_ms", duration.as_millis() as i64);
    span.record("report.persisted", persisted);

    tracing::info!(
        health_score = report.health_score().value(),
        red_flags = report.body().red_flags.len(),
        web_searches = response.web_search_requests,
        cost_usd = response.cost_usd,
        "Diagnostic report generated"
    );

    Ok(report)
}

async fn persist(store: &dyn SubmissionStore, submission: &FormSubmission, report: &Report) -> bool {
    let record = match NewSubmission::from_report(submission, report) {
        Ok(record) => record,
        Err(err) => {
            REPORT_PERSISTENCE_FAILURES.add(1, &[KeyValue::new("error.type", "serialize")]);
            tracing::error!(error = %err, "Could not encode submission for storage");
            return false;
        }
    };

    match store.insert(&record).await {
        Ok(id) => {
            tracing::info!(submission.id = %id, "Submission saved");
            true
        }
        Err(err) => {
            REPORT_PERSISTENCE_FAILURES.add(1, &[KeyValue::new("error.type", "database")]);
            tracing::error!(error = %err, "Failed to save submission");
            false
        }
    }
}
