use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use serde_json::Value;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{FormSubmission, QuestionnaireInput, Report};
use crate::pipeline::generate_report;

pub const MISSING_IDENTITY: &str = "Company name and description are required";

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub success: bool,
    pub report: Report,
}

pub async fn create_report(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<GenerateReportResponse>> {
    let Json(raw) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let submission = FormSubmission::from_json(raw)
        .map_err(|err| AppError::Validation(format!("Invalid questionnaire: {err}")))?;

    validate(submission.input())?;

    let ceiling = state.config.request_timeout();
    let report = tokio::time::timeout(
        ceiling,
        generate_report(
            &state.llm_client,
            &state.generation,
            state.store.as_deref(),
            &submission,
        ),
    )
    .await
    .map_err(|_| AppError::Timeout(ceiling.as_secs()))??;

    Ok(Json(GenerateReportResponse {
        success: true,
        report,
    }))
}

/// Rejects a submission before any model call is made.
fn validate(input: &QuestionnaireInput) -> AppResult<()> {
    let identity = &input.identity;
    if identity.company_name.trim().is_empty() || identity.company_description.trim().is_empty() {
        return Err(AppError::Validation(MISSING_IDENTITY.into()));
    }
    Ok(())
}
