use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::listing::url::{self as listing_url, ParsedListing};

#[derive(Debug, Deserialize)]
pub struct ParseUrlBody {
    #[serde(default)]
    pub url: String,
}

pub async fn parse_url(Json(body): Json<ParseUrlBody>) -> AppResult<Json<ParsedListing>> {
    if body.url.trim().is_empty() {
        return Err(AppError::Validation("url is required".to_string()));
    }

    let parsed = listing_url::parse(&body.url)?;
    Ok(Json(parsed))
}
