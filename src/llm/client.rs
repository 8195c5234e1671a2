use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::pricing::calculate_cost;
use super::{GenerateRequest, GenerateResponse, LlmError, Provider};
use crate::telemetry::metrics::{
    GEN_AI_COST, GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_RETRY_COUNT,
    GEN_AI_TOKEN_USAGE, GEN_AI_WEB_SEARCH_COUNT,
};

/// How many extra attempts a transport-class failure earns. Zero means single shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn single_shot() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    pub fn with_retries(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::single_shot()
        }
    }

    /// Exponential backoff for the given zero-based attempt, capped, plus up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter_ms = fastrand::u64(0..=base.as_millis() as u64 / 4);
        base + Duration::from_millis(jitter_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_shot()
    }
}

pub struct LlmClient {
    provider: Arc<dyn Provider>,
    timeout: Duration,
    retry: RetryPolicy,
    server_address: String,
    server_port: i64,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            provider,
            timeout,
            retry,
            server_address: "unknown".to_string(),
            server_port: 443,
        }
    }

    pub fn with_server(mut self, address: impl Into<String>, port: u16) -> Self {
        self.server_address = address.into();
        self.server_port = i64::from(port);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate_once(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %self.server_address,
            server.port = self.server_port,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.tool.web_search.max_uses = req.web_search_max_uses.map(i64::from),
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.usage.cost_usd = tracing::field::Empty,
            gen_ai.usage.web_search_requests = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            report.stage = %req.stage,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        {
            let mut user_event_attrs =
                vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))];
            if !req.system.is_empty() {
                user_event_attrs.push(KeyValue::new(
                    "gen_ai.system_instructions",
                    truncate(&req.system, 500),
                ));
            }
            span.add_event("gen_ai.user.message", user_event_attrs);
        }

        let call = self.provider.generate(req).instrument(span.clone());
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(resp)) if resp.content.trim().is_empty() => Err(LlmError::EmptyOutput),
            Ok(other) => other,
            Err(_) => Err(LlmError::Timeout(self.timeout.as_secs())),
        };

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(mut resp) => {
                resp.provider = provider_name.clone();
                resp.cost_usd = calculate_cost(
                    &resp.model,
                    resp.input_tokens,
                    resp.output_tokens,
                    resp.web_search_requests,
                );

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                span.record("gen_ai.usage.cost_usd", resp.cost_usd);
                span.record(
                    "gen_ai.usage.web_search_requests",
                    resp.web_search_requests as i64,
                );
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
                let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name);
                let model_kv = KeyValue::new("gen_ai.request.model", resp.model.clone());

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_WEB_SEARCH_COUNT.add(
                    u64::from(resp.web_search_requests),
                    &[provider_kv.clone(), model_kv.clone()],
                );
                GEN_AI_OPERATION_DURATION.record(
                    duration,
                    &[op_kv.clone(), provider_kv.clone(), model_kv.clone()],
                );
                GEN_AI_COST.add(resp.cost_usd, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", err.kind());

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                        KeyValue::new("error.type", err.kind()),
                    ],
                );

                Err(err)
            }
        }
    }

    /// Slow: one retrieval-augmented model turn, tens of seconds is normal.
    /// Retries only transport-class failures, and only as often as the policy allows.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let mut attempt: u32 = 0;

        loop {
            match self.generate_once(req).await {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = self.retry.max_retries,
                        provider = self.provider.name(),
                        model = %req.model,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "LLM call failed, retrying"
                    );

                    GEN_AI_RETRY_COUNT.add(
                        1,
                        &[
                            KeyValue::new("gen_ai.provider.name", self.provider.name().to_string()),
                            KeyValue::new("gen_ai.request.model", req.model.clone()),
                        ],
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}
