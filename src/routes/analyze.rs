use axum::{Json, extract::State};
use serde::Deserialize;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::{AnalyzeRequest, ListingInput, analyze_listing};
use crate::pipeline::format::Report;

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    #[serde(flatten)]
    pub input: ListingInput,
    #[serde(default)]
    pub is_paid: bool,
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> AppResult<Json<Report>> {
    let has_manual_identity = body.input.make.is_some() && body.input.model.is_some();
    if body.input.url.is_none() && !has_manual_identity {
        return Err(AppError::Validation(
            "provide a listing url, or at least year, make and model".to_string(),
        ));
    }

    let request = AnalyzeRequest {
        input: body.input,
        is_paid: body.is_paid,
    };

    let report = analyze_listing(
        &state.upstreams,
        &state.llm_client,
        &state.config,
        &request,
    )
    .await?;

    Ok(Json(report))
}
