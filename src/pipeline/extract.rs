use crate::error::AppError;
use crate::models::ReportBody;
use crate::telemetry::metrics::REPORT_PARSE_FAILURES;

const FENCE: &str = "```";

/// Parses the model's reply into a candidate report.
///
/// Only surrounding code fences are tolerated. Anything else that keeps the text from
/// being exactly one object of the report shape is a parse error: there is no partial
/// acceptance and no field-by-field fallback.
#[tracing::instrument(
    name = "pipeline_stage extract",
    skip_all,
    fields(
        pipeline.stage = "extract",
        extract.raw_chars = raw.len(),
        extract.fenced,
        report.health_score,
        report.red_flags,
    )
)]
pub fn extract(raw: &str) -> Result<ReportBody, AppError> {
    let text = strip_fences(raw);

    let span = tracing::Span::current();
    span.record("extract.fenced", text.len() != raw.trim().len());

    if text.is_empty() {
        REPORT_PARSE_FAILURES.add(1, &[]);
        return Err(AppError::Parse("model output is empty".to_string()));
    }

    match serde_json::from_str::<ReportBody>(text) {
        Ok(body) => {
            span.record("report.health_score", body.health_score.value());
            span.record("report.red_flags", body.red_flags.len());
            Ok(body)
        }
        Err(err) => {
            REPORT_PARSE_FAILURES.add(1, &[]);
            tracing::error!(
                error = %err,
                raw_output = %truncate(raw, 4000),
                "Model output does not match the report shape"
            );
            Err(AppError::Parse(format!(
                "model output does not match the report shape: {err}"
            )))
        }
    }
}

/// Removes a leading fence (with its info string, e.g. `json`) and a trailing fence.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
