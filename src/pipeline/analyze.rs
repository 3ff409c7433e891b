use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{GenerateRequest, LlmClient};

use super::market::MarketComps;
use super::resolve::ResolvedListing;
use super::safety::SafetyRecord;

const LISTING_TEXT_LIMIT: usize = 3000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyScore {
    pub score: u8,
    pub label: String,
    pub one_liner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtAGlance {
    #[serde(default)]
    pub best_thing: String,
    #[serde(default)]
    pub know_before_you_go: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketIntel {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub price_position: String,
    #[serde(default)]
    pub value_factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownIssue {
    pub item: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub what_to_do: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceItem {
    pub service: String,
    #[serde(default)]
    pub typical_cost: String,
    #[serde(default)]
    pub urgency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reliability {
    #[serde(default)]
    pub generation_overview: String,
    #[serde(default)]
    pub known_issues: Vec<KnownIssue>,
    #[serde(default)]
    pub maintenance_upcoming: Vec<MaintenanceItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartQuestion {
    pub ask: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub good_sign: String,
    #[serde(default)]
    pub heads_up: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationStrategy {
    #[serde(default)]
    pub expected_otd: String,
    #[serde(default)]
    pub fees_to_expect: Vec<String>,
    #[serde(default)]
    pub fees_to_question: Vec<String>,
    #[serde(default)]
    pub financing_tip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostToOwn {
    #[serde(default)]
    pub monthly_fuel: String,
    #[serde(default)]
    pub annual_insurance_range: String,
    #[serde(default)]
    pub annual_maintenance: String,
    #[serde(default)]
    pub total_annual_estimate: String,
    #[serde(default)]
    pub ownership_verdict: String,
}

#[derive(Debug, Clone)]
pub struct BriefAnalysis {
    pub buy_score: BuyScore,
    pub at_a_glance: Option<AtAGlance>,
    pub market_intel: Option<MarketIntel>,
    pub reliability: Reliability,
    pub smart_questions: Vec<SmartQuestion>,
    pub negotiation_strategy: Option<NegotiationStrategy>,
    pub cost_to_own: Option<CostToOwn>,
    pub pro_tips: Vec<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    pub provider: String,
}

#[tracing::instrument(
    name = "pipeline_stage analyze",
    skip_all,
    fields(
        pipeline.stage = "analyze",
        analysis.buy_score,
        analysis.smart_questions,
    )
)]
pub async fn analyze(
    llm_client: &LlmClient,
    config: &Config,
    resolved: &ResolvedListing,
    market: Option<&MarketComps>,
    safety: &SafetyRecord,
) -> Result<BriefAnalysis, AppError> {
    let context = build_context(resolved, market, safety);

    let system = include_str!("../../data/system-prompt.txt").to_string();
    let prompt = format!(
        "Analyze this vehicle listing and produce a complete buyer intelligence brief:\n\n{context}"
    );

    let resp = llm_client
        .generate(&GenerateRequest {
            model: config.llm_model.clone(),
            system,
            prompt,
            temperature: config.default_temperature as f32,
            max_tokens: config.default_max_tokens,
            stage: "analyze".to_string(),
        })
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let analysis = parse_brief_response(
        &resp.content,
        resp.input_tokens,
        resp.output_tokens,
        resp.cost_usd,
        resp.provider,
    )?;

    let span = tracing::Span::current();
    span.record("analysis.buy_score", analysis.buy_score.score);
    span.record("analysis.smart_questions", analysis.smart_questions.len());

    Ok(analysis)
}

pub(crate) fn build_context(
    resolved: &ResolvedListing,
    market: Option<&MarketComps>,
    safety: &SafetyRecord,
) -> String {
    let v = &resolved.profile;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "VEHICLE: {} {} {} {}",
        v.year,
        v.make,
        v.model,
        v.trim.as_deref().unwrap_or("")
    );
    if let Some(price) = v.price {
        let _ = writeln!(out, "LISTED PRICE: ${price}");
    }
    if let Some(mileage) = v.mileage {
        let _ = writeln!(out, "MILEAGE: {mileage} miles");
    }
    if let Some(vin) = &v.vin {
        let _ = writeln!(out, "VIN: {vin}");
    }
    if let Some(color) = &v.color {
        let _ = writeln!(out, "COLOR: {color}");
    }
    if let Some(zip) = &v.zip {
        let _ = writeln!(out, "LOCATION ZIP: {zip}");
    }
    if let Some(dealer) = &v.dealer_name {
        let _ = writeln!(out, "DEALER: {dealer}");
    }
    if let Some(engine) = &v.engine {
        let _ = writeln!(out, "ENGINE: {engine}");
    }
    if let Some(transmission) = &v.transmission {
        let _ = writeln!(out, "TRANSMISSION: {transmission}");
    }
    if let Some(drivetrain) = &v.drivetrain {
        let _ = writeln!(out, "DRIVETRAIN: {drivetrain}");
    }
    if let Some(fuel) = &v.fuel_type {
        let _ = writeln!(out, "FUEL: {fuel}");
    }
    if let (Some(city), Some(highway)) = (v.mpg_city, v.mpg_highway) {
        let _ = writeln!(out, "MPG: {city} city / {highway} hwy");
    }
    if let Some(body) = &v.body_type {
        let _ = writeln!(out, "BODY: {body}");
    }

    if let Some(m) = market {
        let _ = writeln!(out, "\nMARKET DATA:");
        let _ = writeln!(out, "  Regional average price: ${}", m.avg_price);
        let _ = writeln!(
            out,
            "  Price range: ${} - ${}",
            m.min_price, m.max_price
        );
        if let Some(percentile) = m.percentile {
            let _ = writeln!(
                out,
                "  This listing is at the {percentile}th percentile (higher = more expensive)"
            );
        }
        let _ = writeln!(
            out,
            "  Comparable listings found: {} (total market: {})",
            m.comp_count, m.total_market
        );
        let _ = writeln!(out, "  Demand score: {}/10", m.demand_score);
    }

    let _ = writeln!(out, "\nSAFETY DATA (NHTSA):");
    let _ = writeln!(out, "  Recalls: {}", safety.recall_count);
    let _ = writeln!(out, "  Consumer complaints: {}", safety.complaint_count);
    if !safety.top_complaint_areas.is_empty() {
        let areas = safety
            .top_complaint_areas
            .iter()
            .map(|a| format!("{} ({})", a.component, a.count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  Top complaint areas: {areas}");
    }
    for recall in safety.recalls.iter().take(3) {
        let summary: String = recall.summary.chars().take(120).collect();
        let _ = writeln!(out, "  Recall: {} - {}", recall.component, summary);
    }

    if !resolved.listing_text.is_empty() {
        let _ = writeln!(out, "\nRAW LISTING TEXT (from seller page):");
        out.extend(resolved.listing_text.chars().take(LISTING_TEXT_LIMIT));
    }

    out
}

fn parse_brief_response(
    content: &str,
    input_tokens: u32,
    output_tokens: u32,
    cost_usd: f64,
    provider: String,
) -> Result<BriefAnalysis, AppError> {
    let json_str = extract_json(content);

    #[derive(Deserialize)]
    struct RawBrief {
        buy_score: Option<BuyScore>,
        at_a_glance: Option<AtAGlance>,
        market_intel: Option<MarketIntel>,
        reliability: Option<Reliability>,
        smart_questions: Option<Vec<SmartQuestion>>,
        negotiation_strategy: Option<NegotiationStrategy>,
        cost_to_own: Option<CostToOwn>,
        pro_tips: Option<Vec<String>>,
    }

    let raw: RawBrief = serde_json::from_str(&json_str)
        .map_err(|e| AppError::Pipeline(format!("model returned unparseable brief: {e}")))?;

    let mut buy_score = raw
        .buy_score
        .ok_or_else(|| AppError::Pipeline("model response missing buy_score".to_string()))?;
    buy_score.score = buy_score.score.clamp(1, 10);

    Ok(BriefAnalysis {
        buy_score,
        at_a_glance: raw.at_a_glance,
        market_intel: raw.market_intel,
        reliability: raw.reliability.unwrap_or_default(),
        smart_questions: raw.smart_questions.unwrap_or_default(),
        negotiation_strategy: raw.negotiation_strategy,
        cost_to_own: raw.cost_to_own,
        pro_tips: raw.pro_tips.unwrap_or_default(),
        input_tokens,
        output_tokens,
        cost_usd,
        provider,
    })
}

pub(crate) fn extract_json(content: &str) -> String {
    if let Some(start) = content.find("```json")
        && let Some(end) = content[start + 7..].find("```")
    {
        return content[start + 7..start + 7 + end].trim().to_string();
    }
    if let Some(start) = content.find("```")
        && let Some(end) = content[start + 3..].find("```")
    {
        let inner = content[start + 3..start + 3 + end].trim();
        if inner.starts_with('{') {
            return inner.to_string();
        }
    }
    if let Some(start) = content.find('{')
        && let Some(end) = content.rfind('}')
    {
        return content[start..=end].to_string();
    }
    content.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::url::ListingSource;
    use crate::pipeline::resolve::VehicleProfile;
    use crate::pipeline::safety::{ComplaintArea, RecallSummary};

    fn civic() -> ResolvedListing {
        ResolvedListing {
            profile: VehicleProfile {
                year: 2019,
                make: "Honda".to_string(),
                model: "Civic".to_string(),
                trim: Some("Sport".to_string()),
                vin: None,
                price: Some(15000),
                mileage: Some(45000),
                zip: None,
                color: None,
                dealer_name: None,
                dealer_phone: None,
                engine: Some("2.0L I4".to_string()),
                transmission: None,
                drivetrain: None,
                fuel_type: None,
                body_type: None,
                mpg_city: Some(30),
                mpg_highway: Some(38),
                photos: vec![],
                source: Some(ListingSource::CarsCom),
                url: None,
            },
            listing_text: String::new(),
        }
    }

    fn sample_safety() -> SafetyRecord {
        SafetyRecord {
            recall_count: 1,
            complaint_count: 12,
            recalls: vec![RecallSummary {
                component: "ELECTRICAL".to_string(),
                summary: "Battery sensor may short.".to_string(),
                consequence: String::new(),
                remedy: String::new(),
            }],
            top_complaint_areas: vec![ComplaintArea {
                component: "ELECTRICAL SYSTEM".to_string(),
                count: 7,
            }],
        }
    }

    #[test]
    fn test_build_context_includes_vehicle_and_safety() {
        let context = build_context(&civic(), None, &sample_safety());
        assert!(context.contains("VEHICLE: 2019 Honda Civic Sport"));
        assert!(context.contains("LISTED PRICE: $15000"));
        assert!(context.contains("MILEAGE: 45000 miles"));
        assert!(context.contains("MPG: 30 city / 38 hwy"));
        assert!(context.contains("Recalls: 1"));
        assert!(context.contains("ELECTRICAL SYSTEM (7)"));
    }

    #[test]
    fn test_build_context_includes_market_when_present() {
        let market = MarketComps {
            avg_price: 15500,
            min_price: 13900,
            max_price: 17800,
            percentile: Some(42),
            comp_count: 38,
            total_market: 120,
            demand_score: 10,
            price_spread_pct: 25,
            prices_sample: vec![],
        };
        let context = build_context(&civic(), Some(&market), &sample_safety());
        assert!(context.contains("Regional average price: $15500"));
        assert!(context.contains("42th percentile"));
        assert!(context.contains("Demand score: 10/10"));
    }

    #[test]
    fn test_build_context_truncates_listing_text() {
        let mut resolved = civic();
        resolved.listing_text = "x".repeat(10_000);
        let context = build_context(&resolved, None, &sample_safety());
        let raw_section = context.split("RAW LISTING TEXT").nth(1).unwrap();
        assert!(raw_section.len() <= LISTING_TEXT_LIMIT + 100);
    }

    #[test]
    fn test_parse_brief_valid() {
        let content = r#"{
            "buy_score": {"score": 8, "label": "Solid Pick", "one_liner": "A good one."},
            "smart_questions": [
                {"ask": "Any accident history?", "why": "history matters"},
                {"ask": "Service records?", "why": "maintenance matters"},
                {"ask": "Why is it priced under market?", "why": "pricing tells"}
            ],
            "negotiation_strategy": {"expected_otd": "$16,200-$16,800"},
            "pro_tips": ["Check the CVT fluid service history."]
        }"#;
        let brief = parse_brief_response(content, 500, 300, 0.01, "groq".to_string()).unwrap();
        assert_eq!(brief.buy_score.score, 8);
        assert_eq!(brief.smart_questions.len(), 3);
        assert!(brief.negotiation_strategy.is_some());
        assert_eq!(brief.pro_tips.len(), 1);
        assert_eq!(brief.input_tokens, 500);
        assert_eq!(brief.provider, "groq");
    }

    #[test]
    fn test_parse_brief_markdown_wrapped() {
        let content = "Here you go:\n```json\n{\"buy_score\": {\"score\": 6, \"label\": \"Worth a Look\", \"one_liner\": \"ok\"}}\n```";
        let brief = parse_brief_response(content, 10, 10, 0.0, "groq".to_string()).unwrap();
        assert_eq!(brief.buy_score.score, 6);
        assert!(brief.smart_questions.is_empty());
    }

    #[test]
    fn test_parse_brief_score_clamped() {
        let content = r#"{"buy_score": {"score": 14, "label": "Great Find", "one_liner": "!"}}"#;
        let brief = parse_brief_response(content, 10, 10, 0.0, "groq".to_string()).unwrap();
        assert_eq!(brief.buy_score.score, 10);
    }

    #[test]
    fn test_parse_brief_missing_buy_score_fails() {
        let content = r#"{"pro_tips": ["tip"]}"#;
        let err = parse_brief_response(content, 10, 10, 0.0, "groq".to_string()).unwrap_err();
        assert!(matches!(err, AppError::Pipeline(_)));
    }

    #[test]
    fn test_parse_brief_not_json_fails() {
        let content = "I cannot help with that.";
        let err = parse_brief_response(content, 10, 10, 0.0, "groq".to_string()).unwrap_err();
        assert!(matches!(err, AppError::Pipeline(_)));
    }

    #[test]
    fn test_extract_json_raw() {
        let input = r#"{"buy_score": {"score": 7}}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn test_extract_json_embedded_in_text() {
        let input = "The result is {\"a\": 1} and that's it.";
        assert_eq!(extract_json(input), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_generic_code_block() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(input), "{\"key\": \"value\"}");
    }
}
