use std::collections::HashMap;

use serde::Serialize;

use crate::error::AppError;
use crate::upstream::Upstreams;
use crate::upstream::nhtsa::{Complaint, Recall};

use super::resolve::VehicleProfile;

const RECALL_LIMIT: usize = 10;
const COMPLAINT_AREA_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct RecallSummary {
    pub component: String,
    pub summary: String,
    pub consequence: String,
    pub remedy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintArea {
    pub component: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyRecord {
    pub recall_count: usize,
    pub complaint_count: usize,
    pub recalls: Vec<RecallSummary>,
    pub top_complaint_areas: Vec<ComplaintArea>,
}

#[tracing::instrument(
    name = "pipeline_stage safety",
    skip(upstreams, profile),
    fields(
        pipeline.stage = "safety",
        safety.recalls,
        safety.complaints,
    )
)]
pub async fn fetch_safety(
    upstreams: &Upstreams,
    profile: &VehicleProfile,
) -> Result<SafetyRecord, AppError> {
    let recalls = upstreams
        .nhtsa
        .recalls(profile.year, &profile.make, &profile.model)
        .await?;
    let complaints = upstreams
        .nhtsa
        .complaints(profile.year, &profile.make, &profile.model)
        .await?;

    let record = summarize(recalls, complaints);

    let span = tracing::Span::current();
    span.record("safety.recalls", record.recall_count);
    span.record("safety.complaints", record.complaint_count);

    Ok(record)
}

pub(crate) fn summarize(recalls: Vec<Recall>, complaints: Vec<Complaint>) -> SafetyRecord {
    let recall_count = recalls.len();
    let recall_summaries: Vec<RecallSummary> = recalls
        .into_iter()
        .take(RECALL_LIMIT)
        .map(|r| RecallSummary {
            component: r.component.unwrap_or_else(|| "Unknown".to_string()),
            summary: r.summary.unwrap_or_default(),
            consequence: r.consequence.unwrap_or_default(),
            remedy: r.remedy.unwrap_or_default(),
        })
        .collect();

    let complaint_count = complaints.len();
    let mut areas: HashMap<String, u32> = HashMap::new();
    for complaint in complaints {
        let component = complaint
            .components
            .unwrap_or_else(|| "Unknown".to_string());
        *areas.entry(component).or_insert(0) += 1;
    }

    let mut top_complaint_areas: Vec<ComplaintArea> = areas
        .into_iter()
        .map(|(component, count)| ComplaintArea { component, count })
        .collect();
    // Highest count first; name as tiebreak so output is stable.
    top_complaint_areas.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.component.cmp(&b.component))
    });
    top_complaint_areas.truncate(COMPLAINT_AREA_LIMIT);

    SafetyRecord {
        recall_count,
        complaint_count,
        recalls: recall_summaries,
        top_complaint_areas,
    }
}
