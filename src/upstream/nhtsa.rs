use reqwest::Client;
use serde::Deserialize;

use crate::error::AppError;

use super::execute_json;

pub struct NhtsaClient {
    http: Client,
    base_url: String,
}

// NHTSA capitalizes recall keys but not complaint keys.
#[derive(Debug, Clone, Deserialize)]
pub struct Recall {
    #[serde(default, rename = "Component")]
    pub component: Option<String>,
    #[serde(default, rename = "Summary")]
    pub summary: Option<String>,
    #[serde(default, rename = "Consequence")]
    pub consequence: Option<String>,
    #[serde(default, rename = "Remedy")]
    pub remedy: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Complaint {
    #[serde(default)]
    pub components: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

impl NhtsaClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    #[tracing::instrument(skip(self), fields(upstream.name = "nhtsa"))]
    pub async fn recalls(
        &self,
        year: i32,
        make: &str,
        model: &str,
    ) -> Result<Vec<Recall>, AppError> {
        let request = self
            .http
            .get(format!("{}/recalls/recallsByVehicle", self.base_url))
            .query(&[
                ("make", make),
                ("model", model),
                ("modelYear", &year.to_string()),
            ]);

        let envelope: ResultsEnvelope<Recall> = execute_json("nhtsa", request).await?;
        Ok(envelope.results)
    }

    #[tracing::instrument(skip(self), fields(upstream.name = "nhtsa"))]
    pub async fn complaints(
        &self,
        year: i32,
        make: &str,
        model: &str,
    ) -> Result<Vec<Complaint>, AppError> {
        let request = self
            .http
            .get(format!("{}/complaints/complaintsByVehicle", self.base_url))
            .query(&[
                ("make", make),
                ("model", model),
                ("modelYear", &year.to_string()),
            ]);

        let envelope: ResultsEnvelope<Complaint> = execute_json("nhtsa", request).await?;
        Ok(envelope.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_deserializes_capitalized_keys() {
        let json = r#"{
            "Component": "AIR BAGS",
            "Summary": "Inflator may rupture.",
            "Consequence": "Increased risk of injury.",
            "Remedy": "Dealer will replace the inflator."
        }"#;
        let recall: Recall = serde_json::from_str(json).unwrap();
        assert_eq!(recall.component.as_deref(), Some("AIR BAGS"));
        assert_eq!(recall.remedy.as_deref(), Some("Dealer will replace the inflator."));
    }

    #[test]
    fn test_complaint_lowercase_components() {
        let complaint: Complaint =
            serde_json::from_str(r#"{"components": "ELECTRICAL SYSTEM"}"#).unwrap();
        assert_eq!(complaint.components.as_deref(), Some("ELECTRICAL SYSTEM"));
    }

    #[test]
    fn test_envelope_defaults_to_empty_results() {
        let envelope: ResultsEnvelope<Recall> = serde_json::from_str("{}").unwrap();
        assert!(envelope.results.is_empty());
    }
}
