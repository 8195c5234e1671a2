use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::compat::{
    CashFlowFields, GrowthFields, IndustryFields, resolve_credit_line,
    resolve_customer_payment_terms, resolve_growth_barriers, resolve_vendor_payment_terms,
};

/// Rendered wherever an answer is absent.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Sentinel option that unlocks a free-text elaboration.
pub const OTHER: &str = "Other";

/// The questionnaire as posted by the diagnostic form. The JSON is flat; each group
/// below is flattened into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireInput {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub financials: Financials,
    #[serde(flatten)]
    pub competition: CompetitiveContext,
    #[serde(flatten)]
    pub strategy: StrategicPosture,
    #[serde(flatten)]
    pub customers: CustomerHealth,
    #[serde(flatten)]
    pub cash_flow: CashFlow,
    #[serde(flatten)]
    pub operations: Operations,
    #[serde(flatten)]
    pub growth: GrowthCapacity,
    #[serde(flatten)]
    pub risk: RiskProfile,
    #[serde(flatten)]
    pub market: MarketPosition,
}

impl QuestionnaireInput {
    pub fn company_name(&self) -> &str {
        &self.identity.company_name
    }

    /// Industry as fed to the prompt and persisted; never used as the report subject.
    pub fn resolved_industry(&self) -> &str {
        self.identity.industry.resolved()
    }
}

/// A decoded questionnaire kept next to the JSON exactly as the form posted it.
/// The typed side drives the prompt; the raw side is what gets stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    raw: Value,
    input: QuestionnaireInput,
}

impl FormSubmission {
    pub fn from_json(raw: Value) -> Result<Self, serde_json::Error> {
        let input = QuestionnaireInput::deserialize(&raw)?;
        Ok(Self { raw, input })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn input(&self) -> &QuestionnaireInput {
        &self.input
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Defaulted so that an absent name is reported by the boundary check, not serde.
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_description: String,
    pub years_in_business: String,
    #[serde(flatten)]
    pub industry: Industry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndustryFields", into = "IndustryFields")]
pub enum Industry {
    Listed(String),
    /// The "Other" option; `custom` is the free-text industry, when given.
    Other { custom: Option<String> },
}

impl Industry {
    pub fn resolved(&self) -> &str {
        match self {
            Industry::Listed(industry) => industry,
            Industry::Other { custom: Some(custom) } => custom,
            Industry::Other { custom: None } => OTHER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub annual_revenue: String,
    pub gross_margin: String,
    pub net_margin: String,
    pub is_profitable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitiveContext {
    pub competition_level: String,
    pub main_competitors: String,
    pub competing_on: Vec<String>,
    pub market_demand: String,
    pub competitive_pressure: String,
    pub disruption_threats: Vec<String>,
    pub entry_barriers: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicPosture {
    pub can_articulate_difference: String,
    pub has_written_plan: String,
    #[serde(rename = "successIn3Years")]
    pub success_in_3_years: String,
    pub reacting_or_anticipating: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHealth {
    pub revenue_trend: String,
    pub active_customers: String,
    #[serde(rename = "top3CustomerPercentage")]
    pub top_3_customer_percentage: String,
    pub why_customers_choose: String,
    pub customer_churn: String,
    pub sales_cycle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CashFlowFields", into = "CashFlowFields")]
pub struct CashFlow {
    pub days_of_cash: String,
    pub struggled_with_payroll: String,
    pub customer_payment_terms: Option<String>,
    pub vendor_payment_terms: Option<String>,
    pub credit_line: CreditLine,
    pub cash_crunch_causes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditLine {
    Yes { usage: Option<String> },
    /// Any answer other than "Yes", kept verbatim.
    Answered(String),
    Unspecified,
}

impl CreditLine {
    pub fn answer(&self) -> &str {
        match self {
            CreditLine::Yes { .. } => "Yes",
            CreditLine::Answered(answer) => answer,
            CreditLine::Unspecified => NOT_SPECIFIED,
        }
    }

    pub fn usage(&self) -> Option<&str> {
        match self {
            CreditLine::Yes { usage } => usage.as_deref(),
            _ => None,
        }
    }
}

impl From<CashFlowFields> for CashFlow {
    fn from(fields: CashFlowFields) -> Self {
        let customer_payment_terms = resolve_customer_payment_terms(&fields);
        let vendor_payment_terms = resolve_vendor_payment_terms(&fields);
        let credit_line = resolve_credit_line(&fields);
        CashFlow {
            days_of_cash: fields.days_of_cash,
            struggled_with_payroll: fields.struggled_with_payroll,
            customer_payment_terms,
            vendor_payment_terms,
            credit_line,
            cash_crunch_causes: fields.cash_crunch_causes,
        }
    }
}

impl From<CashFlow> for CashFlowFields {
    fn from(cash_flow: CashFlow) -> Self {
        let (has_line_of_credit, line_of_credit_usage) = match cash_flow.credit_line {
            CreditLine::Yes { usage } => (Some("Yes".to_string()), usage),
            CreditLine::Answered(answer) => (Some(answer), None),
            CreditLine::Unspecified => (None, None),
        };
        CashFlowFields {
            days_of_cash: cash_flow.days_of_cash,
            struggled_with_payroll: cash_flow.struggled_with_payroll,
            customer_payment_terms: cash_flow.customer_payment_terms,
            vendor_payment_terms: cash_flow.vendor_payment_terms,
            has_line_of_credit,
            line_of_credit_usage,
            cash_crunch_causes: cash_flow.cash_crunch_causes,
            payment_terms: None,
            uses_line_of_credit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operations {
    pub what_would_break: String,
    pub time_in_vs_on: String,
    pub could_run_without_owner: String,
    pub rework_time: String,
    pub biggest_bottleneck: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GrowthFields", into = "GrowthFields")]
pub struct GrowthCapacity {
    pub barriers: GrowthBarriers,
    pub operating_at_capacity: String,
    pub invest_if_had_money: String,
    pub turned_down_opportunities: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrowthBarriers {
    /// Checkbox answers; `other` exists only when `reasons` contains [`OTHER`].
    Selected {
        reasons: Vec<String>,
        other: Option<String>,
    },
    /// The old single-select answer.
    Legacy(String),
    Unspecified,
}

impl From<GrowthFields> for GrowthCapacity {
    fn from(fields: GrowthFields) -> Self {
        let barriers = resolve_growth_barriers(&fields);
        GrowthCapacity {
            barriers,
            operating_at_capacity: fields.operating_at_capacity,
            invest_if_had_money: fields.invest_if_had_money,
            turned_down_opportunities: fields.turned_down_opportunities,
        }
    }
}

impl From<GrowthCapacity> for GrowthFields {
    fn from(growth: GrowthCapacity) -> Self {
        let (stopping_growth_reasons, stopping_growth_other, stopping_growth) =
            match growth.barriers {
                GrowthBarriers::Selected { reasons, other } => (Some(reasons), other, None),
                GrowthBarriers::Legacy(legacy) => (None, None, Some(legacy)),
                GrowthBarriers::Unspecified => (None, None, None),
            };
        GrowthFields {
            stopping_growth_reasons,
            stopping_growth_other,
            operating_at_capacity: growth.operating_at_capacity,
            invest_if_had_money: growth.invest_if_had_money,
            turned_down_opportunities: growth.turned_down_opportunities,
            stopping_growth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    pub biggest_customer_leaving: String,
    pub keeps_owner_awake: String,
    pub has_insurance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPosition {
    pub is_market_growing: String,
    pub competitive_pressure_change: String,
}
