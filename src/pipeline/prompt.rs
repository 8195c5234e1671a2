use crate::models::{GrowthBarriers, NOT_SPECIFIED, QuestionnaireInput};

const SYSTEM_INSTRUCTIONS: &str = include_str!("prompts/system.txt");

const RESEARCH_INSTRUCTIONS: &str = "INSTRUCTIONS:
1. Use web_search extensively to research:
   - This specific company (if public information is available)
   - Their exact market niche
   - Industry benchmarks and standards
   - The competitive landscape
   - Recent market trends and disruptions
2. Connect the dots between their competitive context, financial answers and operational answers.
3. Identify patterns specific to businesses in their situation.
4. Return the diagnostic report as a single JSON object (no markdown, no code fences, no citation markers).";

/// System and user instructions for one generation call. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

struct Section {
    heading: &'static str,
    lines: Vec<(&'static str, String)>,
}

/// Pure and deterministic: the same questionnaire always yields byte-identical text.
#[tracing::instrument(
    name = "pipeline_stage prompt",
    skip_all,
    fields(
        pipeline.stage = "prompt",
        prompt.system_chars,
        prompt.user_chars,
    )
)]
pub fn build(input: &QuestionnaireInput) -> PromptPair {
    let mut user = String::new();
    for section in sections(input) {
        user.push_str(section.heading);
        user.push_str(":\n");
        for (label, value) in &section.lines {
            user.push_str(label);
            user.push_str(": ");
            user.push_str(value);
            user.push('\n');
        }
        user.push('\n');
    }
    user.push_str(RESEARCH_INSTRUCTIONS);

    let span = tracing::Span::current();
    span.record("prompt.system_chars", SYSTEM_INSTRUCTIONS.len());
    span.record("prompt.user_chars", user.len());

    PromptPair {
        system: SYSTEM_INSTRUCTIONS.to_string(),
        user,
    }
}

fn sections(input: &QuestionnaireInput) -> Vec<Section> {
    let identity = &input.identity;
    let financials = &input.financials;
    let competition = &input.competition;
    let strategy = &input.strategy;
    let customers = &input.customers;
    let cash_flow = &input.cash_flow;
    let operations = &input.operations;
    let growth = &input.growth;
    let risk = &input.risk;
    let market = &input.market;

    let (growth_reasons, growth_other) = match &growth.barriers {
        GrowthBarriers::Selected { reasons, other } => (join(reasons), optional(other.as_deref())),
        GrowthBarriers::Legacy(legacy) => (answer(legacy), NOT_SPECIFIED.to_string()),
        GrowthBarriers::Unspecified => (NOT_SPECIFIED.to_string(), NOT_SPECIFIED.to_string()),
    };

    vec![
        Section {
            heading: "COMPANY TO ANALYZE",
            lines: vec![
                ("Name", answer(&identity.company_name)),
                ("Description", answer(&identity.company_description)),
                ("Industry", answer(input.resolved_industry())),
                ("Years Operating", answer(&identity.years_in_business)),
            ],
        },
        Section {
            heading: "FINANCIALS (Self-Reported)",
            lines: vec![
                ("Annual Revenue", answer(&financials.annual_revenue)),
                ("Gross Margin", answer(&financials.gross_margin)),
                ("Net Margin", answer(&financials.net_margin)),
                ("Currently Profitable", answer(&financials.is_profitable)),
            ],
        },
        Section {
            heading: "COMPETITIVE CONTEXT",
            lines: vec![
                ("Competition Level", answer(&competition.competition_level)),
                ("Main Competitors", answer(&competition.main_competitors)),
                ("Competing On", join(&competition.competing_on)),
                ("Market Demand", answer(&competition.market_demand)),
                (
                    "Competitive Pressure Trend",
                    answer(&competition.competitive_pressure),
                ),
                ("Disruption Threats", join(&competition.disruption_threats)),
                ("Entry Barriers", answer(&competition.entry_barriers)),
            ],
        },
        Section {
            heading: "STRATEGIC FOUNDATION",
            lines: vec![
                (
                    "Can Articulate Difference",
                    answer(&strategy.can_articulate_difference),
                ),
                ("Has Written Plan", answer(&strategy.has_written_plan)),
                ("Success in 3 Years", answer(&strategy.success_in_3_years)),
                (
                    "Reacting or Anticipating",
                    answer(&strategy.reacting_or_anticipating),
                ),
            ],
        },
        Section {
            heading: "REVENUE & CUSTOMERS",
            lines: vec![
                ("Revenue Trend", answer(&customers.revenue_trend)),
                ("Active Customers", answer(&customers.active_customers)),
                (
                    "Top 3 Customers %",
                    answer(&customers.top_3_customer_percentage),
                ),
                (
                    "Why Customers Choose Them",
                    answer(&customers.why_customers_choose),
                ),
                ("Customer Churn", answer(&customers.customer_churn)),
                ("Sales Cycle", answer(&customers.sales_cycle)),
            ],
        },
        Section {
            heading: "CASH FLOW",
            lines: vec![
                ("Days of Cash", answer(&cash_flow.days_of_cash)),
                (
                    "Struggled with Payroll",
                    answer(&cash_flow.struggled_with_payroll),
                ),
                (
                    "Customer Payment Terms",
                    optional(cash_flow.customer_payment_terms.as_deref()),
                ),
                (
                    "Vendor Payment Terms",
                    optional(cash_flow.vendor_payment_terms.as_deref()),
                ),
                ("Has Line of Credit", answer(cash_flow.credit_line.answer())),
                (
                    "Line of Credit Usage",
                    optional(cash_flow.credit_line.usage()),
                ),
                ("Cash Crunch Causes", answer(&cash_flow.cash_crunch_causes)),
            ],
        },
        Section {
            heading: "OPERATIONS",
            lines: vec![
                (
                    "What Would Break at 50% More Volume",
                    answer(&operations.what_would_break),
                ),
                ("Time IN vs ON Business", answer(&operations.time_in_vs_on)),
                (
                    "Could Run Without Owner",
                    answer(&operations.could_run_without_owner),
                ),
                ("Rework Time", answer(&operations.rework_time)),
                ("Biggest Bottleneck", answer(&operations.biggest_bottleneck)),
            ],
        },
        Section {
            heading: "GROWTH",
            lines: vec![
                ("What's Stopping Growth", growth_reasons),
                ("Other Growth Barriers", growth_other),
                (
                    "Operating at Capacity",
                    answer(&growth.operating_at_capacity),
                ),
                (
                    "Would Invest If Had Money",
                    answer(&growth.invest_if_had_money),
                ),
                (
                    "Turned Down Opportunities",
                    answer(&growth.turned_down_opportunities),
                ),
            ],
        },
        Section {
            heading: "RISK",
            lines: vec![
                (
                    "Biggest Customer Leaving Impact",
                    answer(&risk.biggest_customer_leaving),
                ),
                ("What Keeps Owner Awake", answer(&risk.keeps_owner_awake)),
                ("Has Insurance", answer(&risk.has_insurance)),
            ],
        },
        Section {
            heading: "MARKET",
            lines: vec![
                ("Market Growth", answer(&market.is_market_growing)),
                (
                    "Competitive Pressure Change",
                    answer(&market.competitive_pressure_change),
                ),
            ],
        },
    ]
}

fn answer(value: &str) -> String {
    optional(Some(value))
}

fn optional(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_SPECIFIED)
        .to_string()
}

fn join(values: &[String]) -> String {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    answer(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::questionnaire::fixtures::form;
    use serde_json::json;

    fn line<'a>(prompt: &'a PromptPair, label: &str) -> &'a str {
        let prefix = format!("{label}: ");
        prompt
            .user
            .lines()
            .find_map(|l| l.strip_prefix(prefix.as_str()))
            .unwrap_or_else(|| panic!("no line for {label:?}"))
    }

    #[test]
    fn test_build_is_deterministic() {
        let input = form(json!({}));
        assert_eq!(build(&input), build(&input.clone()));
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let prompt = build(&form(json!({})));
        let headings = [
            "COMPANY TO ANALYZE:",
            "FINANCIALS (Self-Reported):",
            "COMPETITIVE CONTEXT:",
            "STRATEGIC FOUNDATION:",
            "REVENUE & CUSTOMERS:",
            "CASH FLOW:",
            "OPERATIONS:",
            "GROWTH:",
            "RISK:",
            "MARKET:",
            "INSTRUCTIONS:",
        ];
        let positions: Vec<usize> = headings
            .iter()
            .map(|h| prompt.user.find(h).unwrap_or_else(|| panic!("missing {h}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn test_renders_every_answer() {
        let prompt = build(&form(json!({})));
        assert_eq!(line(&prompt, "Name"), "Kopi Corner Pte Ltd");
        assert_eq!(line(&prompt, "Industry"), "F&B - Restaurant/Cafe");
        assert_eq!(line(&prompt, "Gross Margin"), "30-40%");
        assert_eq!(line(&prompt, "Competing On"), "Price, Location, Quality");
        assert_eq!(line(&prompt, "Disruption Threats"), "Delivery apps, Rising rent");
        assert_eq!(line(&prompt, "Top 3 Customers %"), "<10%");
        assert_eq!(line(&prompt, "Vendor Payment Terms"), "30 days");
        assert_eq!(line(&prompt, "Line of Credit Usage"), "Occasionally");
        assert_eq!(line(&prompt, "What's Stopping Growth"), "Cash flow, Other");
        assert_eq!(
            line(&prompt, "Other Growth Barriers"),
            "Landlord will not renew beyond two years"
        );
        assert_eq!(
            line(&prompt, "Competitive Pressure Change"),
            "Much more intense"
        );
    }

    #[test]
    fn test_custom_industry_only_changes_industry_line() {
        let prompt = build(&form(json!({
            "industry": "Other",
            "customIndustry": "Artisanal Soap"
        })));
        assert_eq!(line(&prompt, "Industry"), "Artisanal Soap");
        assert_eq!(line(&prompt, "Name"), "Kopi Corner Pte Ltd");
    }

    #[test]
    fn test_credit_line_no_renders_placeholder_usage() {
        let prompt = build(&form(json!({
            "hasLineOfCredit": "No",
            "lineOfCreditUsage": ""
        })));
        assert_eq!(line(&prompt, "Has Line of Credit"), "No");
        assert_eq!(line(&prompt, "Line of Credit Usage"), NOT_SPECIFIED);
    }

    #[test]
    fn test_legacy_payment_terms_fallback() {
        let prompt = build(&form(json!({
            "customerPaymentTerms": null,
            "vendorPaymentTerms": null,
            "paymentTerms": "Net 30"
        })));
        assert_eq!(line(&prompt, "Customer Payment Terms"), "Net 30");
        assert_eq!(line(&prompt, "Vendor Payment Terms"), NOT_SPECIFIED);
    }

    #[test]
    fn test_legacy_growth_answer() {
        let prompt = build(&form(json!({
            "stoppingGrowthReasons": null,
            "stoppingGrowthOther": null,
            "stoppingGrowth": "Can't find staff"
        })));
        assert_eq!(line(&prompt, "What's Stopping Growth"), "Can't find staff");
        assert_eq!(line(&prompt, "Other Growth Barriers"), NOT_SPECIFIED);
    }

    #[test]
    fn test_other_elaboration_dropped_without_sentinel() {
        let prompt = build(&form(json!({
            "stoppingGrowthReasons": ["Cash flow"],
            "stoppingGrowthOther": "should not appear"
        })));
        assert_eq!(line(&prompt, "Other Growth Barriers"), NOT_SPECIFIED);
        assert!(!prompt.user.contains("should not appear"));
    }

    #[test]
    fn test_empty_lists_render_placeholder() {
        let prompt = build(&form(json!({ "competingOn": [], "disruptionThreats": ["", " "] })));
        assert_eq!(line(&prompt, "Competing On"), NOT_SPECIFIED);
        assert_eq!(line(&prompt, "Disruption Threats"), NOT_SPECIFIED);
    }

    #[test]
    fn test_system_instructions_carry_contract() {
        let prompt = build(&form(json!({})));
        assert!(prompt.system.contains("exactly one JSON object"));
        assert!(prompt.system.contains("\"healthScore\""));
        assert!(prompt.system.contains("<critical|high|medium>"));
        assert!(prompt.system.contains("no code fences"));
        assert!(prompt.system.contains("a $100 market becomes $104 next year"));
        assert!(!prompt.system.contains("\"subjectName\""));
        assert!(!prompt.system.contains("\"generatedAt\""));
    }
}
