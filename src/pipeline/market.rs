use serde::Serialize;

use crate::config::Config;
use crate::error::AppError;
use crate::upstream::Upstreams;
use crate::upstream::autodev::{CompsQuery, ListingsPage};

use super::resolve::VehicleProfile;

const SAMPLE_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct MarketComps {
    pub avg_price: u32,
    pub min_price: u32,
    pub max_price: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentile: Option<u8>,
    pub comp_count: usize,
    pub total_market: u64,
    pub demand_score: u8,
    pub price_spread_pct: u32,
    pub prices_sample: Vec<u32>,
}

/// Pull comparable listings and reduce them to pricing statistics.
/// Returns None when the provider has no priced comps for this vehicle;
/// that is absent data, not an upstream failure.
#[tracing::instrument(
    name = "pipeline_stage market",
    skip(upstreams, profile, config),
    fields(
        pipeline.stage = "market",
        market.comp_count,
        market.total,
    )
)]
pub async fn fetch_market(
    upstreams: &Upstreams,
    profile: &VehicleProfile,
    config: &Config,
) -> Result<Option<MarketComps>, AppError> {
    let query = CompsQuery {
        make: profile.make.clone(),
        model: profile.model.clone(),
        year: Some(profile.year),
        zip: profile
            .zip
            .clone()
            .unwrap_or_else(|| config.default_zip.clone()),
        radius_miles: config.comp_radius_miles,
        page_size: config.comp_page_size,
    };

    let page = upstreams.autodev.search_comps(&query).await?;
    let comps = summarize(page, profile.price);

    let span = tracing::Span::current();
    if let Some(ref c) = comps {
        span.record("market.comp_count", c.comp_count);
        span.record("market.total", c.total_market);
    }

    Ok(comps)
}

pub(crate) fn summarize(page: ListingsPage, listing_price: Option<u32>) -> Option<MarketComps> {
    let mut prices: Vec<u32> = page
        .records
        .iter()
        .filter_map(|r| r.price)
        .filter(|&p| p > 0)
        .collect();

    if prices.is_empty() {
        return None;
    }
    prices.sort_unstable();

    let comp_count = prices.len();
    let total_market = page.total_count.unwrap_or(comp_count as u64);
    let sum: u64 = prices.iter().map(|&p| u64::from(p)).sum();
    let avg_price = (sum / comp_count as u64) as u32;
    let min_price = prices[0];
    let max_price = prices[comp_count - 1];

    let percentile = listing_price.map(|asking| {
        let below = prices.iter().filter(|&&p| p <= asking).count();
        ((below as f64 / comp_count as f64) * 100.0).round() as u8
    });

    let price_spread_pct = if avg_price > 0 {
        ((f64::from(max_price - min_price) / f64::from(avg_price)) * 100.0).round() as u32
    } else {
        0
    };

    let demand_score = (total_market / 10).clamp(1, 10) as u8;

    prices.truncate(SAMPLE_LIMIT);

    Some(MarketComps {
        avg_price,
        min_price,
        max_price,
        percentile,
        comp_count,
        total_market,
        demand_score,
        price_spread_pct,
        prices_sample: prices,
    })
}
