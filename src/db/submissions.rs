use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{FormSubmission, Report};

/// Status every fresh submission starts in; follow-up tooling moves it on.
pub const INITIAL_STATUS: &str = "new";

/// One row of the `submissions` table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub company_name: String,
    pub industry: String,
    pub annual_revenue: String,
    pub health_score: i32,
    pub form_data: Value,
    pub report_data: Value,
    pub status: &'static str,
}

impl NewSubmission {
    /// `form_data` is the JSON exactly as posted, legacy and unused keys included.
    pub fn from_report(
        submission: &FormSubmission,
        report: &Report,
    ) -> Result<Self, serde_json::Error> {
        let input = submission.input();
        Ok(Self {
            company_name: input.company_name().to_string(),
            industry: input.resolved_industry().to_string(),
            annual_revenue: input.financials.annual_revenue.clone(),
            health_score: i32::from(report.health_score().value()),
            form_data: submission.raw().clone(),
            report_data: serde_json::to_value(report)?,
            status: INITIAL_STATUS,
        })
    }
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: &NewSubmission) -> Result<Uuid, sqlx::Error>;
}

pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    #[tracing::instrument(
        name = "db.submissions.insert",
        skip_all,
        fields(db.system = "postgresql", db.operation = "INSERT", db.sql.table = "submissions")
    )]
    async fn insert(&self, submission: &NewSubmission) -> Result<Uuid, sqlx::Error> {
        let row: (Uuid,) = sqlx::query_as(
            "INSERT INTO submissions \
             (company_name, industry, annual_revenue, health_score, form_data, report_data, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(&submission.company_name)
        .bind(&submission.industry)
        .bind(&submission.annual_revenue)
        .bind(submission.health_score)
        .bind(&submission.form_data)
        .bind(&submission.report_data)
        .bind(submission.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
