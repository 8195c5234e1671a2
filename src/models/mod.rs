pub mod compat;
pub mod questionnaire;
pub mod report;

pub use questionnaire::{
    CashFlow, CreditLine, FormSubmission, GrowthBarriers, GrowthCapacity, Industry,
    NOT_SPECIFIED, OTHER, QuestionnaireInput,
};
pub use report::{
    CompetitiveIntelligence, HealthBand, HealthScore, Implications, RedFlag, Report, ReportBody,
    Severity,
};
