use chrono::{DateTime, Utc};

use crate::models::{QuestionnaireInput, Report, ReportBody};

/// Stamps a sanitized body with the subject and the generation time. The subject is
/// always the company name as submitted, never the resolved industry.
pub fn assemble(body: ReportBody, input: &QuestionnaireInput) -> Report {
    assemble_at(body, input, Utc::now())
}

#[tracing::instrument(
    name = "pipeline_stage assemble",
    skip_all,
    fields(pipeline.stage = "assemble", report.generated_at = %generated_at)
)]
pub fn assemble_at(
    body: ReportBody,
    input: &QuestionnaireInput,
    generated_at: DateTime<Utc>,
) -> Report {
    Report::new(input.company_name().to_string(), generated_at, body)
}
