#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use diagnostic_report_service::config::Config;
use diagnostic_report_service::db::{NewSubmission, SubmissionStore};
use diagnostic_report_service::llm::{
    GenerateRequest, GenerateResponse, LlmClient, LlmError, Provider, RetryPolicy,
};
use diagnostic_report_service::models::FormSubmission;
use diagnostic_report_service::pipeline::GenerationSettings;
use diagnostic_report_service::{AppState, app};

pub fn form_json() -> Value {
    json!({
        "companyName": "Harbour Joinery",
        "companyDescription": "Custom kitchen cabinets and fitted wardrobes",
        "yearsInBusiness": "11 years",
        "industry": "Construction - Specialty Trade",
        "customIndustry": "",
        "annualRevenue": "$1M-$5M",
        "grossMargin": "20-30%",
        "netMargin": "0-5%",
        "isProfitable": "Breaking even",
        "competitionLevel": "High",
        "mainCompetitors": "IKEA, two local workshops",
        "competingOn": ["Quality", "Customization"],
        "marketDemand": "Declining",
        "competitivePressure": "Increasing",
        "disruptionThreats": ["Flat-pack imports"],
        "entryBarriers": "Medium",
        "canArticulateDifference": "Yes",
        "hasWrittenPlan": "No",
        "successIn3Years": "Steady order book",
        "reactingOrAnticipating": "Reacting",
        "revenueTrend": "Down 10%",
        "activeCustomers": "40-60 per year",
        "top3CustomerPercentage": "30-50%",
        "whyCustomersChoose": "Craftsmanship",
        "customerChurn": "High",
        "salesCycle": "1-3 months",
        "daysOfCash": "Under 30 days",
        "struggledWithPayroll": "Several times",
        "customerPaymentTerms": "50% deposit, balance on install",
        "vendorPaymentTerms": "Cash on delivery",
        "hasLineOfCredit": "Yes",
        "lineOfCreditUsage": "Constantly",
        "cashCrunchCauses": "Late final payments",
        "whatWouldBreak": "Workshop space",
        "timeInVsOn": "95% in",
        "couldRunWithoutOwner": "No",
        "reworkTime": "Significant",
        "biggestBottleneck": "Skilled labour",
        "stoppingGrowthReasons": ["Hiring"],
        "stoppingGrowthOther": "",
        "operatingAtCapacity": "Yes",
        "investIfHadMoney": "CNC machine",
        "turnedDownOpportunities": "Commercial fit-outs",
        "biggestCustomerLeaving": "Serious",
        "keepsOwnerAwake": "Cash flow",
        "hasInsurance": "Partially",
        "isMarketGrowing": "No",
        "competitivePressureChange": "More intense"
    })
}

/// The base form with `overrides` merged in; a `null` override removes the key.
pub fn form_with(overrides: Value) -> Value {
    let mut base = form_json();
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), overrides) {
        for (key, value) in extra {
            if value.is_null() {
                base.remove(&key);
            } else {
                base.insert(key, value);
            }
        }
    }
    base
}

pub fn form(overrides: Value) -> FormSubmission {
    FormSubmission::from_json(form_with(overrides)).expect("form fixture deserializes")
}

pub fn report_json() -> Value {
    json!({
        "healthScore": 34,
        "competitiveIntelligence": {
            "marketReality": "Fewer homes are being renovated this year [1].",
            "industryBenchmarks": "Most workshops keep about 30 cents from every dollar <cite index=\"2-1\">before wages</cite>.",
            "competitiveSet": "IKEA wins on price and speed.",
            "researchSources": ["https://example.org/renovation-outlook", "Trade association survey"]
        },
        "redFlags": [
            {"title": "Cash runway [2]", "description": "You have under a month of cash.", "severity": "critical"},
            {"title": "Owner bottleneck", "description": "Every job passes through you.", "severity": "high"},
            {"title": "Customer concentration", "description": "Three builders bring half your work.", "severity": "medium"}
        ],
        "hiddenPattern": "Deposits fund the previous job, so every slow month compounds.",
        "implications": {
            "shortTerm": "Payroll gets missed after one late payment.",
            "longTerm": "The workshop stalls at its current size."
        },
        "recommendations": ["Move to staged payments [3]", "Train a lead hand"],
        "nextSteps": "Book a session to rebuild your payment terms.",
        "subjectName": "Model Invented Name",
        "generatedAt": "2001-01-01T00:00:00Z"
    })
}

enum Reply {
    Content(String),
    Failure(fn() -> LlmError),
    Stall(Duration),
}

/// Replays one canned reply and keeps every request it was sent.
pub struct FakeProvider {
    reply: Reply,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeProvider {
    pub fn replying(content: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Content(content.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(failure: fn() -> LlmError) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Failure(failure),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Sits on the request for `delay` before answering with an empty reply.
    pub fn stalling(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Stall(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.requests.lock().unwrap().push(req.clone());
        match &self.reply {
            Reply::Content(content) => Ok(GenerateResponse {
                content: content.clone(),
                model: req.model.clone(),
                input_tokens: 1200,
                output_tokens: 800,
                web_search_requests: 3,
                cost_usd: 0.0,
                finish_reason: "end_turn".to_string(),
                provider: String::new(),
            }),
            Reply::Failure(failure) => Err(failure()),
            Reply::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Err(LlmError::EmptyOutput)
            }
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Keeps every submission in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<Vec<NewSubmission>>,
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<Uuid, sqlx::Error> {
        self.rows.lock().unwrap().push(submission.clone());
        Ok(Uuid::new_v4())
    }
}

/// Fails every insert, the way an unreachable database would.
pub struct BrokenStore;

#[async_trait]
impl SubmissionStore for BrokenStore {
    async fn insert(&self, _submission: &NewSubmission) -> Result<Uuid, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

pub fn llm_client(provider: Arc<FakeProvider>) -> LlmClient {
    LlmClient::new(provider, Duration::from_secs(5), RetryPolicy::single_shot())
}

pub fn settings() -> GenerationSettings {
    GenerationSettings {
        model: "claude-sonnet-4-20250514".to_string(),
        max_tokens: 4000,
        web_search_max_uses: 5,
    }
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        environment: "test".to_string(),
        database_url: None,
        anthropic_api_key: "test-key".to_string(),
        anthropic_base_url: "http://localhost:0".to_string(),
        llm_model: "claude-sonnet-4-20250514".to_string(),
        llm_max_tokens: 4000,
        llm_timeout_secs: 5,
        llm_max_retries: 0,
        llm_retry_base_ms: 1,
        web_search_max_uses: 5,
        request_timeout_secs: 10,
        otel_service_name: "diagnostic-report-service-test".to_string(),
        otel_exporter_endpoint: None,
    }
}

pub fn test_app(
    provider: Arc<FakeProvider>,
    store: Option<Arc<dyn SubmissionStore>>,
) -> axum::Router {
    test_app_with_config(test_config(), provider, store)
}

pub fn test_app_with_config(
    config: Config,
    provider: Arc<FakeProvider>,
    store: Option<Arc<dyn SubmissionStore>>,
) -> axum::Router {
    let state = AppState::new(config, Arc::new(llm_client(provider)), store);
    app(state)
}
