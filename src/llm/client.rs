use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::pricing::{PROVIDER_PORTS, PROVIDER_SERVERS, calculate_cost};
use super::{GenerateRequest, GenerateResponse, Provider};
use crate::telemetry::metrics::{
    GEN_AI_COST, GEN_AI_ERROR_COUNT, GEN_AI_FALLBACK_COUNT, GEN_AI_OPERATION_DURATION,
    GEN_AI_RETRY_COUNT, GEN_AI_TOKEN_USAGE,
};

const MAX_RETRIES: u32 = 3;

pub struct LlmClient {
    pub primary: Arc<dyn Provider>,
    pub fallback: Option<Arc<dyn Provider>>,
    pub primary_provider: String,
    pub fallback_provider: String,
    pub fallback_model: String,
}

impl LlmClient {
    /// One provider call wrapped in a gen_ai span with token, cost and
    /// duration accounting.
    async fn generate_once(
        &self,
        provider: &dyn Provider,
        provider_name: &str,
        req: &GenerateRequest,
    ) -> anyhow::Result<GenerateResponse> {
        let server_addr = PROVIDER_SERVERS
            .get(provider_name)
            .copied()
            .unwrap_or("unknown");
        let server_port = PROVIDER_PORTS.get(provider_name).copied().unwrap_or(443);

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %format!("gen_ai.chat {}", req.model),
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %server_addr,
            server.port = server_port,
            gen_ai.request.temperature = req.temperature,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.usage.cost_usd = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            report.stage = %req.stage,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "gen_ai.user.message",
            vec![
                KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000)),
                KeyValue::new("gen_ai.system_instructions", truncate(&req.system, 500)),
            ],
        );

        let start = Instant::now();
        let result = provider.generate(req).instrument(span.clone()).await;
        let duration = start.elapsed().as_secs_f64();

        let base_attrs = [
            KeyValue::new("gen_ai.operation.name", "chat"),
            KeyValue::new("gen_ai.provider.name", provider_name.to_string()),
            KeyValue::new("gen_ai.request.model", req.model.clone()),
        ];
        GEN_AI_OPERATION_DURATION.record(duration, &base_attrs);

        match result {
            Ok(mut resp) => {
                resp.provider = provider_name.to_string();
                resp.cost_usd = calculate_cost(&resp.model, resp.input_tokens, resp.output_tokens);

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                span.record("gen_ai.usage.cost_usd", resp.cost_usd);
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

                for (token_type, count) in
                    [("input", resp.input_tokens), ("output", resp.output_tokens)]
                {
                    let mut attrs = base_attrs.to_vec();
                    attrs.push(KeyValue::new("gen_ai.token.type", token_type));
                    GEN_AI_TOKEN_USAGE.record(f64::from(count), &attrs);
                }
                GEN_AI_COST.add(resp.cost_usd, &base_attrs);

                Ok(resp)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", classify_error(&err));

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name.to_string()),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                    ],
                );

                Err(err)
            }
        }
    }

    async fn generate_with_retry(
        &self,
        provider: &dyn Provider,
        provider_name: &str,
        req: &GenerateRequest,
    ) -> anyhow::Result<GenerateResponse> {
        let mut last_err = None;

        for attempt in 0..MAX_RETRIES {
            match self.generate_once(provider, provider_name, req).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        provider = provider_name,
                        model = %req.model,
                        error = %err,
                        "LLM call failed, retrying"
                    );

                    if attempt > 0 {
                        GEN_AI_RETRY_COUNT.add(
                            1,
                            &[
                                KeyValue::new("gen_ai.provider.name", provider_name.to_string()),
                                KeyValue::new("gen_ai.request.model", req.model.clone()),
                            ],
                        );
                    }

                    last_err = Some(err);

                    if attempt < MAX_RETRIES - 1 {
                        let base = Duration::from_secs(1) * 2u32.pow(attempt);
                        let base = base.min(Duration::from_secs(10));
                        // 25% jitter to avoid thundering herd
                        let jitter_ms = fastrand::u64(0..=base.as_millis() as u64 / 4);
                        tokio::time::sleep(base + Duration::from_millis(jitter_ms)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("all retries exhausted")))
    }

    pub async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        match self
            .generate_with_retry(self.primary.as_ref(), &self.primary_provider, req)
            .await
        {
            Ok(resp) => Ok(resp),
            Err(primary_err) => {
                let Some(ref fallback) = self.fallback else {
                    return Err(anyhow::anyhow!(
                        "primary provider {} failed after retries: {}",
                        self.primary_provider,
                        primary_err
                    ));
                };

                tracing::warn!(
                    primary_provider = %self.primary_provider,
                    fallback_provider = %self.fallback_provider,
                    error = %primary_err,
                    "Primary provider failed, falling back"
                );
                GEN_AI_FALLBACK_COUNT.add(1, &[]);

                let fallback_req = GenerateRequest {
                    model: self.fallback_model.clone(),
                    ..req.clone()
                };

                self.generate_with_retry(fallback.as_ref(), &self.fallback_provider, &fallback_req)
                    .await
            }
        }
    }
}

fn classify_error(err: &anyhow::Error) -> &'static str {
    let msg = err.to_string().to_lowercase();
    if msg.contains("rate limit") || msg.contains("429") {
        "rate_limit"
    } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        "timeout"
    } else if msg.contains("401")
        || msg.contains("403")
        || msg.contains("auth")
        || msg.contains("api key")
    {
        "auth_error"
    } else if msg.contains("400") || msg.contains("422") || msg.contains("invalid") {
        "invalid_request"
    } else if msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("server")
    {
        "server_error"
    } else if msg.contains("connect")
        || msg.contains("dns")
        || msg.contains("network")
        || msg.contains("reset")
    {
        "network_error"
    } else {
        "unknown_error"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error_categories() {
        let cases = vec![
            ("rate limit exceeded", "rate_limit"),
            ("status 429: too many requests", "rate_limit"),
            ("request timed out", "timeout"),
            ("401 unauthorized", "auth_error"),
            ("invalid api key", "auth_error"),
            ("400 bad request", "invalid_request"),
            ("503 service unavailable", "server_error"),
            ("connection refused", "network_error"),
            ("connection reset by peer", "network_error"),
            ("something unexpected", "unknown_error"),
        ];

        for (msg, expected) in cases {
            let err = anyhow::anyhow!("{}", msg);
            assert_eq!(
                classify_error(&err),
                expected,
                "classify_error({msg:?}) should be {expected:?}"
            );
        }
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("hé世界!", 3);
        assert!(result.len() <= 3);
        assert!(result.is_char_boundary(result.len()));
    }
}
