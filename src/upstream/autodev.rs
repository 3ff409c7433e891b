use reqwest::Client;
use serde::Deserialize;

use crate::error::AppError;

use super::execute_json;

pub struct AutoDevClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub dealer_name: Option<String>,
    pub dealer_phone: Option<String>,
    pub display_color: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    pub body_type: Option<String>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub mpg_city: Option<u32>,
    pub mpg_highway: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListingsPage {
    #[serde(default)]
    pub records: Vec<ListingRecord>,
    #[serde(default, rename = "totalCount")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CompsQuery {
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub zip: String,
    pub radius_miles: u32,
    pub page_size: u32,
}

impl AutoDevClient {
    pub fn new(http: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("AUTODEV_API_KEY is not configured".to_string()))
    }

    /// Decode a VIN into the richest available listing record.
    #[tracing::instrument(skip(self), fields(upstream.name = "autodev"))]
    pub async fn decode_vin(&self, vin: &str) -> Result<Option<ListingRecord>, AppError> {
        let request = self
            .http
            .get(&self.base_url)
            .query(&[("vin", vin)])
            .bearer_auth(self.key()?);

        let page: ListingsPage = execute_json("autodev", request).await?;
        Ok(page.records.into_iter().next())
    }

    /// Search comparable listings around a zip code. Year window is
    /// year-1..year+1, clamped at 1990 like the provider expects.
    #[tracing::instrument(skip(self, query), fields(upstream.name = "autodev", comps.make = %query.make, comps.model = %query.model))]
    pub async fn search_comps(&self, query: &CompsQuery) -> Result<ListingsPage, AppError> {
        let mut params: Vec<(&str, String)> = vec![
            ("make", query.make.clone()),
            ("model", query.model.clone()),
        ];
        if let Some(year) = query.year {
            params.push(("year_min", (year - 1).max(1990).to_string()));
            params.push(("year_max", (year + 1).to_string()));
        }
        params.push(("zip", query.zip.clone()));
        params.push(("radius", query.radius_miles.to_string()));
        params.push(("page_size", query.page_size.to_string()));

        let request = self
            .http
            .get(&self.base_url)
            .query(&params)
            .bearer_auth(self.key()?);

        execute_json("autodev", request).await
    }
}
