use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::execute_json;

// Some listing sites refuse non-browser user agents on the plain-GET path.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub struct ExaClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScrapedPage {
    pub text: String,
    pub image_links: Vec<String>,
}

#[derive(Serialize)]
struct ContentsRequest<'a> {
    urls: [&'a str; 1],
    text: bool,
    extras: ContentsExtras,
}

#[derive(Serialize)]
struct ContentsExtras {
    links: u32,
    #[serde(rename = "imageLinks")]
    image_links: u32,
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    results: Vec<ContentsResult>,
}

#[derive(Deserialize)]
struct ContentsResult {
    #[serde(default)]
    text: String,
    #[serde(default)]
    extras: ResultExtras,
}

#[derive(Deserialize, Default)]
struct ResultExtras {
    #[serde(default, rename = "imageLinks")]
    image_links: Vec<String>,
}

impl ExaClient {
    pub fn new(http: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    /// Fetch clean page content for a listing URL. Uses the contents API
    /// when a key is configured, dropping to a plain GET when the API has
    /// nothing for the URL or no key is set.
    #[tracing::instrument(skip(self), fields(upstream.name = "exa"))]
    pub async fn scrape(&self, url: &str) -> Result<ScrapedPage, AppError> {
        let Some(key) = self.api_key.as_deref() else {
            return self.fetch_basic(url).await;
        };

        let body = ContentsRequest {
            urls: [url],
            text: true,
            extras: ContentsExtras {
                links: 3,
                image_links: 5,
            },
        };

        let request = self
            .http
            .post(format!("{}/contents", self.base_url))
            .header("x-api-key", key)
            .json(&body);

        match execute_json::<ContentsResponse>("exa", request).await {
            Ok(response) => match response.results.into_iter().next() {
                Some(result) => Ok(ScrapedPage {
                    text: result.text,
                    image_links: result.extras.image_links,
                }),
                None => self.fetch_basic(url).await,
            },
            Err(err) => {
                tracing::warn!(error = %err, "contents API scrape failed, trying plain fetch");
                self.fetch_basic(url).await
            }
        }
    }

    async fn fetch_basic(&self, url: &str) -> Result<ScrapedPage, AppError> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("listing fetch: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "listing page returned {status}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("listing fetch: {e}")))?;

        Ok(ScrapedPage {
            text,
            image_links: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_request_wire_shape() {
        let body = ContentsRequest {
            urls: ["https://example.com/listing"],
            text: true,
            extras: ContentsExtras {
                links: 3,
                image_links: 5,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["urls"][0], "https://example.com/listing");
        assert_eq!(json["text"], true);
        assert_eq!(json["extras"]["imageLinks"], 5);
    }

    #[test]
    fn test_contents_response_with_images() {
        let json = r#"{
            "results": [
                {"text": "2019 Honda Civic $15,000", "extras": {"imageLinks": ["https://img.example/a.jpg"]}}
            ]
        }"#;
        let response: ContentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results[0].text, "2019 Honda Civic $15,000");
        assert_eq!(response.results[0].extras.image_links.len(), 1);
    }

    #[test]
    fn test_contents_response_empty() {
        let response: ContentsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());
    }
}
