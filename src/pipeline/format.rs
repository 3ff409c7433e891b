use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::analyze::{
    AtAGlance, BriefAnalysis, BuyScore, CostToOwn, KnownIssue, MaintenanceItem,
    NegotiationStrategy, SmartQuestion,
};
use super::market::MarketComps;
use super::resolve::VehicleProfile;
use super::safety::{ComplaintArea, RecallSummary, SafetyRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Paid,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketPosition {
    pub summary: String,
    pub price_position: String,
    pub value_factors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comps: Option<MarketComps>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReliabilityIntel {
    pub generation_overview: String,
    pub known_issues: Vec<KnownIssue>,
    pub maintenance_upcoming: Vec<MaintenanceItem>,
    pub recall_count: usize,
    pub complaint_count: usize,
    pub recalls: Vec<RecallSummary>,
    pub top_complaint_areas: Vec<ComplaintArea>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tier: Tier,
    pub vehicle: VehicleProfile,
    pub buy_score: BuyScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_a_glance: Option<AtAGlance>,
    pub market_position: MarketPosition,
    pub reliability: ReliabilityIntel,
    pub smart_questions: Vec<SmartQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negotiation_strategy: Option<NegotiationStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_to_own: Option<CostToOwn>,
    pub pro_tips: Vec<String>,
    pub total_tokens: u32,
    pub total_cost_usd: f64,
    pub provider_used: String,
    pub generation_duration_ms: u64,
    pub trace_id: String,
}

pub struct FormatParams {
    pub vehicle: VehicleProfile,
    pub market: Option<MarketComps>,
    pub safety: SafetyRecord,
    pub analysis: BriefAnalysis,
    pub duration: Duration,
    pub trace_id: String,
}

/// Merge every stage's output into the paid-view Report. Tier projection
/// happens afterwards.
#[tracing::instrument(
    name = "pipeline_stage format",
    skip(params),
    fields(
        pipeline.stage = "format",
        report.buy_score,
    )
)]
pub fn format_report(params: FormatParams) -> Report {
    let FormatParams {
        vehicle,
        market,
        safety,
        analysis,
        duration,
        trace_id,
    } = params;

    let intel = analysis.market_intel.unwrap_or_default();
    let market_position = MarketPosition {
        summary: intel.summary,
        price_position: if intel.price_position.is_empty() {
            "unknown".to_string()
        } else {
            intel.price_position
        },
        value_factors: intel.value_factors,
        comps: market,
    };

    let reliability = ReliabilityIntel {
        generation_overview: analysis.reliability.generation_overview,
        known_issues: analysis.reliability.known_issues,
        maintenance_upcoming: analysis.reliability.maintenance_upcoming,
        recall_count: safety.recall_count,
        complaint_count: safety.complaint_count,
        recalls: safety.recalls,
        top_complaint_areas: safety.top_complaint_areas,
    };

    let span = tracing::Span::current();
    span.record("report.buy_score", analysis.buy_score.score);

    Report {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        tier: Tier::Paid,
        vehicle,
        buy_score: analysis.buy_score,
        at_a_glance: analysis.at_a_glance,
        market_position,
        reliability,
        smart_questions: analysis.smart_questions,
        negotiation_strategy: analysis.negotiation_strategy,
        cost_to_own: analysis.cost_to_own,
        pro_tips: analysis.pro_tips,
        total_tokens: analysis.input_tokens + analysis.output_tokens,
        total_cost_usd: analysis.cost_usd,
        provider_used: analysis.provider,
        generation_duration_ms: duration.as_millis() as u64,
        trace_id,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::analyze::MarketIntel;

    pub(crate) fn sample_report() -> Report {
        let analysis = BriefAnalysis {
            buy_score: BuyScore {
                score: 8,
                label: "Solid Pick".to_string(),
                one_liner: "A well-kept example at a fair price.".to_string(),
            },
            at_a_glance: Some(AtAGlance {
                best_thing: "Strong service history".to_string(),
                know_before_you_go: "Verify the CVT fluid was changed".to_string(),
            }),
            market_intel: Some(MarketIntel {
                summary: "Priced slightly under the regional average.".to_string(),
                price_position: "below_market".to_string(),
                value_factors: vec!["Higher mileage than average comp".to_string()],
            }),
            reliability: crate::pipeline::analyze::Reliability {
                generation_overview: "Tenth-gen Civics hold up well.".to_string(),
                known_issues: vec![
                    KnownIssue {
                        item: "AC condenser failures".to_string(),
                        severity: "worth_checking".to_string(),
                        context: "Common on 2016-2019 builds".to_string(),
                        what_to_do: "Test max AC on the drive".to_string(),
                    },
                    KnownIssue {
                        item: "Fuel injector carbon buildup".to_string(),
                        severity: "minor_quirk".to_string(),
                        context: "Mostly on short-trip cars".to_string(),
                        what_to_do: "Listen for cold-start roughness".to_string(),
                    },
                    KnownIssue {
                        item: "Infotainment freezes".to_string(),
                        severity: "minor_quirk".to_string(),
                        context: "Fixed by software update".to_string(),
                        what_to_do: "Ask if updates were applied".to_string(),
                    },
                ],
                maintenance_upcoming: vec![MaintenanceItem {
                    service: "CVT fluid change".to_string(),
                    typical_cost: "$120-$180".to_string(),
                    urgency: "due_now".to_string(),
                }],
            },
            smart_questions: vec![
                SmartQuestion {
                    ask: "Any accident history on the Carfax?".to_string(),
                    why: "Civics are commonly commuter cars".to_string(),
                    good_sign: "Clean one-owner report".to_string(),
                    heads_up: "Structural repair entries".to_string(),
                },
                SmartQuestion {
                    ask: "When was the CVT fluid last changed?".to_string(),
                    why: "The CVT is the known weak point".to_string(),
                    good_sign: "Records at 30k intervals".to_string(),
                    heads_up: "Never been done at 45k".to_string(),
                },
                SmartQuestion {
                    ask: "Is the AC blowing cold at idle?".to_string(),
                    why: "Condenser failures are documented".to_string(),
                    good_sign: "Ice cold with receipts".to_string(),
                    heads_up: "Recently recharged".to_string(),
                },
            ],
            negotiation_strategy: Some(NegotiationStrategy {
                expected_otd: "$16,200-$16,900".to_string(),
                fees_to_expect: vec!["Doc fee ~$250".to_string()],
                fees_to_question: vec!["Nitrogen tires $200".to_string()],
                financing_tip: "Bring a credit-union pre-approval".to_string(),
            }),
            cost_to_own: Some(CostToOwn {
                monthly_fuel: "$110-$130".to_string(),
                annual_insurance_range: "$1,200-$1,600".to_string(),
                annual_maintenance: "$400-$600".to_string(),
                total_annual_estimate: "$3,000-$3,800".to_string(),
                ownership_verdict: "Cheap to own for the class.".to_string(),
            }),
            pro_tips: vec!["Sport trims hold resale better than LX.".to_string()],
            input_tokens: 900,
            output_tokens: 600,
            cost_usd: 0.0012,
            provider: "groq".to_string(),
        };

        let safety = SafetyRecord {
            recall_count: 1,
            complaint_count: 34,
            recalls: vec![RecallSummary {
                component: "ELECTRICAL".to_string(),
                summary: "Battery sensor may short.".to_string(),
                consequence: "Possible fire.".to_string(),
                remedy: "Dealer replaces sensor.".to_string(),
            }],
            top_complaint_areas: vec![ComplaintArea {
                component: "ELECTRICAL SYSTEM".to_string(),
                count: 12,
            }],
        };

        let market = MarketComps {
            avg_price: 15500,
            min_price: 13900,
            max_price: 17800,
            percentile: Some(42),
            comp_count: 38,
            total_market: 120,
            demand_score: 10,
            price_spread_pct: 25,
            prices_sample: vec![13900, 14500, 15000],
        };

        let vehicle = VehicleProfile {
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
            engine: None,
            transmission: None,
            drivetrain: None,
            fuel_type: None,
            body_type: None,
            mpg_city: None,
            mpg_highway: None,
            photos: vec![],
            source: None,
            url: None,
        };

        format_report(FormatParams {
            vehicle,
            market: Some(market),
            safety,
            analysis,
            duration: Duration::from_millis(5400),
            trace_id: "abc123trace".to_string(),
        })
    }

    #[test]
    fn test_format_report_assembles_all_fields() {
        let report = sample_report();
        assert_eq!(report.tier, Tier::Paid);
        assert_eq!(report.buy_score.score, 8);
        assert_eq!(report.vehicle.make, "Honda");
        assert_eq!(report.market_position.price_position, "below_market");
        assert_eq!(
            report.market_position.comps.as_ref().unwrap().comp_count,
            38
        );
        assert_eq!(report.reliability.recall_count, 1);
        assert_eq!(report.reliability.known_issues.len(), 3);
        assert_eq!(report.smart_questions.len(), 3);
        assert!(report.negotiation_strategy.is_some());
        assert_eq!(report.total_tokens, 1500);
        assert_eq!(report.provider_used, "groq");
        assert_eq!(report.generation_duration_ms, 5400);
        assert_eq!(report.trace_id, "abc123trace");
    }

    #[test]
    fn test_format_report_defaults_without_market_intel() {
        let base = sample_report();
        let analysis = BriefAnalysis {
            market_intel: None,
            ..sample_analysis_from(&base)
        };
        let report = format_report(FormatParams {
            vehicle: base.vehicle.clone(),
            market: None,
            safety: SafetyRecord {
                recall_count: 0,
                complaint_count: 0,
                recalls: vec![],
                top_complaint_areas: vec![],
            },
            analysis,
            duration: Duration::from_millis(100),
            trace_id: String::new(),
        });
        assert_eq!(report.market_position.price_position, "unknown");
        assert!(report.market_position.summary.is_empty());
        assert!(report.market_position.comps.is_none());
    }

    fn sample_analysis_from(report: &Report) -> BriefAnalysis {
        BriefAnalysis {
            buy_score: report.buy_score.clone(),
            at_a_glance: report.at_a_glance.clone(),
            market_intel: None,
            reliability: crate::pipeline::analyze::Reliability::default(),
            smart_questions: report.smart_questions.clone(),
            negotiation_strategy: report.negotiation_strategy.clone(),
            cost_to_own: report.cost_to_own.clone(),
            pro_tips: report.pro_tips.clone(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            provider: "groq".to_string(),
        }
    }
}
