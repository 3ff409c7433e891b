use opentelemetry::trace::TraceContextExt;
use serde::Deserialize;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::LlmClient;
use crate::telemetry::metrics::{
    REPORT_GENERATION_DURATION, REPORT_MARKET_COMPS, REPORT_SMART_QUESTIONS,
};
use crate::upstream::Upstreams;

use super::format::{self, FormatParams, Report};
use super::resolve::ListingInput;
use super::{analyze, market, resolve, safety, tier};

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub input: ListingInput,
    pub is_paid: bool,
}

/// URL or manual description in, tier-projected buying brief out. Stages
/// run sequentially; the first failed required call fails the request.
#[tracing::instrument(
    name = "pipeline report",
    skip(upstreams, llm_client, config, request),
    fields(
        report.id,
        report.tier,
        report.duration_ms,
    )
)]
pub async fn analyze_listing(
    upstreams: &Upstreams,
    llm_client: &LlmClient,
    config: &Config,
    request: &AnalyzeRequest,
) -> Result<Report, AppError> {
    let start = std::time::Instant::now();

    // Fail before spending upstream calls if the brief can never be
    // generated.
    if config.llm_api_key().is_none() {
        return Err(AppError::Unauthorized(format!(
            "no API key configured for LLM provider {}",
            config.llm_provider
        )));
    }

    let span = tracing::Span::current();
    let context = span.context();
    let otel_span = context.span();
    let trace_id = otel_span.span_context().trace_id().to_string();

    // Stage 1: Resolve vehicle identity (URL parse, scrape, VIN decode)
    let resolved = resolve::resolve(upstreams, &request.input).await?;

    tracing::info!(
        year = resolved.profile.year,
        make = %resolved.profile.make,
        model = %resolved.profile.model,
        price = resolved.profile.price,
        "Analyzing listing"
    );

    // Stage 2: Market comparables
    let market = market::fetch_market(upstreams, &resolved.profile, config).await?;

    // Stage 3: Recalls and complaints
    let safety = safety::fetch_safety(upstreams, &resolved.profile).await?;

    // Stage 4: LLM buying brief
    let analysis = analyze::analyze(llm_client, config, &resolved, market.as_ref(), &safety).await?;

    // Stage 5: Assemble the paid view
    let duration = start.elapsed();
    let report = format::format_report(FormatParams {
        vehicle: resolved.profile,
        market,
        safety,
        analysis,
        duration,
        trace_id,
    });

    REPORT_GENERATION_DURATION.record(duration.as_secs_f64(), &[]);
    REPORT_MARKET_COMPS.record(
        report
            .market_position
            .comps
            .as_ref()
            .map(|c| c.comp_count as f64)
            .unwrap_or(0.0),
        &[],
    );
    REPORT_SMART_QUESTIONS.record(report.smart_questions.len() as f64, &[]);

    span.record("report.id", report.id.to_string());
    span.record("report.duration_ms", report.generation_duration_ms);

    // Stage 6: Tier projection
    let report = tier::project(report, request.is_paid);
    span.record("report.tier", if request.is_paid { "paid" } else { "free" });

    Ok(report)
}
