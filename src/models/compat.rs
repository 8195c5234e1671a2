//! Wire shapes for the questionnaire groups whose fields evolved over time.
//!
//! The form posts a flat JSON object. Some answers only make sense next to a parent
//! answer, and two older fields were superseded by newer ones. These structs mirror
//! the JSON exactly; the `resolve_*` functions turn them into the tagged domain types
//! in [`super::questionnaire`], which is the only place precedence rules live.

use serde::{Deserialize, Serialize};

use super::questionnaire::{CreditLine, GrowthBarriers, Industry, OTHER};

/// Trimmed value, or `None` when absent or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Prefer the current field, fall back to the legacy one. Blank counts as absent.
pub fn prefer_current(current: Option<String>, legacy: Option<String>) -> Option<String> {
    non_blank(current).or_else(|| non_blank(legacy))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryFields {
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_industry: Option<String>,
}

pub fn resolve_industry(fields: IndustryFields) -> Industry {
    if fields.industry.trim() == OTHER {
        Industry::Other {
            custom: non_blank(fields.custom_industry),
        }
    } else {
        Industry::Listed(fields.industry)
    }
}

impl From<IndustryFields> for Industry {
    fn from(fields: IndustryFields) -> Self {
        resolve_industry(fields)
    }
}

impl From<Industry> for IndustryFields {
    fn from(industry: Industry) -> Self {
        match industry {
            Industry::Listed(industry) => IndustryFields {
                industry,
                custom_industry: None,
            },
            Industry::Other { custom } => IndustryFields {
                industry: OTHER.to_string(),
                custom_industry: custom,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowFields {
    pub days_of_cash: String,
    pub struggled_with_payroll: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_payment_terms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_payment_terms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_line_of_credit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_of_credit_usage: Option<String>,
    pub cash_crunch_causes: String,
    /// Superseded by `customer_payment_terms` and `vendor_payment_terms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,
    /// Superseded by `has_line_of_credit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses_line_of_credit: Option<String>,
}

/// The old single `paymentTerms` answer described what customers were given.
pub fn resolve_customer_payment_terms(fields: &CashFlowFields) -> Option<String> {
    prefer_current(
        fields.customer_payment_terms.clone(),
        fields.payment_terms.clone(),
    )
}

pub fn resolve_vendor_payment_terms(fields: &CashFlowFields) -> Option<String> {
    non_blank(fields.vendor_payment_terms.clone())
}

/// Usage is kept only when the business actually has a credit line.
pub fn resolve_credit_line(fields: &CashFlowFields) -> CreditLine {
    match prefer_current(
        fields.has_line_of_credit.clone(),
        fields.uses_line_of_credit.clone(),
    ) {
        Some(answer) if answer.eq_ignore_ascii_case("yes") => CreditLine::Yes {
            usage: non_blank(fields.line_of_credit_usage.clone()),
        },
        Some(answer) => CreditLine::Answered(answer),
        None => CreditLine::Unspecified,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_growth_reasons: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_growth_other: Option<String>,
    pub operating_at_capacity: String,
    pub invest_if_had_money: String,
    pub turned_down_opportunities: String,
    /// Superseded by `stopping_growth_reasons`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopping_growth: Option<String>,
}

/// The elaboration survives only when the reasons include the "Other" sentinel.
pub fn resolve_growth_barriers(fields: &GrowthFields) -> GrowthBarriers {
    let reasons: Vec<String> = fields
        .stopping_growth_reasons
        .iter()
        .flatten()
        .filter_map(|r| non_blank(Some(r.clone())))
        .collect();

    if !reasons.is_empty() {
        let other = if reasons.iter().any(|r| r == OTHER) {
            non_blank(fields.stopping_growth_other.clone())
        } else {
            None
        };
        return GrowthBarriers::Selected { reasons, other };
    }

    match non_blank(fields.stopping_growth.clone()) {
        Some(legacy) => GrowthBarriers::Legacy(legacy),
        None => GrowthBarriers::Unspecified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_prefer_current_precedence() {
        assert_eq!(prefer_current(s("Net 30"), s("Net 60")), s("Net 30"));
        assert_eq!(prefer_current(None, s("Net 60")), s("Net 60"));
        assert_eq!(prefer_current(s("   "), s("Net 60")), s("Net 60"));
        assert_eq!(prefer_current(None, None), None);
        assert_eq!(prefer_current(s(""), s("")), None);
    }

    #[test]
    fn test_industry_other_with_custom() {
        let industry = resolve_industry(IndustryFields {
            industry: "Other".to_string(),
            custom_industry: s(" Artisanal Soap "),
        });
        assert_eq!(
            industry,
            Industry::Other {
                custom: s("Artisanal Soap")
            }
        );
    }

    #[test]
    fn test_industry_listed_drops_custom() {
        let industry = resolve_industry(IndustryFields {
            industry: "Retail - E-commerce".to_string(),
            custom_industry: s("ignored"),
        });
        assert_eq!(industry, Industry::Listed("Retail - E-commerce".to_string()));
    }

    #[test]
    fn test_customer_terms_fall_back_to_legacy() {
        let fields = CashFlowFields {
            payment_terms: s("30 days"),
            ..Default::default()
        };
        assert_eq!(resolve_customer_payment_terms(&fields), s("30 days"));
        assert_eq!(resolve_vendor_payment_terms(&fields), None);
    }

    #[test]
    fn test_credit_line_usage_only_when_yes() {
        let fields = CashFlowFields {
            has_line_of_credit: s("No"),
            line_of_credit_usage: s("Regularly"),
            ..Default::default()
        };
        assert_eq!(
            resolve_credit_line(&fields),
            CreditLine::Answered("No".to_string())
        );

        let fields = CashFlowFields {
            has_line_of_credit: s("Yes"),
            line_of_credit_usage: s("Occasionally"),
            ..Default::default()
        };
        assert_eq!(
            resolve_credit_line(&fields),
            CreditLine::Yes {
                usage: s("Occasionally")
            }
        );
    }

    #[test]
    fn test_credit_line_legacy_and_missing() {
        let fields = CashFlowFields {
            uses_line_of_credit: s("Yes"),
            ..Default::default()
        };
        assert_eq!(resolve_credit_line(&fields), CreditLine::Yes { usage: None });
        assert_eq!(
            resolve_credit_line(&CashFlowFields::default()),
            CreditLine::Unspecified
        );
    }

    #[test]
    fn test_growth_other_requires_sentinel() {
        let fields = GrowthFields {
            stopping_growth_reasons: Some(vec!["Cash flow".to_string()]),
            stopping_growth_other: s("Landlord"),
            ..Default::default()
        };
        assert_eq!(
            resolve_growth_barriers(&fields),
            GrowthBarriers::Selected {
                reasons: vec!["Cash flow".to_string()],
                other: None
            }
        );

        let fields = GrowthFields {
            stopping_growth_reasons: Some(vec!["Cash flow".to_string(), "Other".to_string()]),
            stopping_growth_other: s("Landlord"),
            ..Default::default()
        };
        assert_eq!(
            resolve_growth_barriers(&fields),
            GrowthBarriers::Selected {
                reasons: vec!["Cash flow".to_string(), "Other".to_string()],
                other: s("Landlord")
            }
        );
    }

    #[test]
    fn test_growth_empty_reasons_fall_back_to_legacy() {
        let fields = GrowthFields {
            stopping_growth_reasons: Some(vec![]),
            stopping_growth: s("Not enough staff"),
            ..Default::default()
        };
        assert_eq!(
            resolve_growth_barriers(&fields),
            GrowthBarriers::Legacy("Not enough staff".to_string())
        );
        assert_eq!(
            resolve_growth_barriers(&GrowthFields::default()),
            GrowthBarriers::Unspecified
        );
    }
}
