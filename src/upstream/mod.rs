use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::AppError;
use crate::telemetry::metrics::{UPSTREAM_ERROR_COUNT, UPSTREAM_REQUEST_DURATION};

pub mod autodev;
pub mod exa;
pub mod nhtsa;

pub use autodev::AutoDevClient;
pub use exa::ExaClient;
pub use nhtsa::NhtsaClient;

const USER_AGENT: &str = concat!("car-scout/", env!("CARGO_PKG_VERSION"));

// Scrapes can be slow; the data APIs should not be.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(15);
const DATA_API_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Upstreams {
    pub autodev: AutoDevClient,
    pub nhtsa: NhtsaClient,
    pub scraper: ExaClient,
}

impl Upstreams {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            autodev: AutoDevClient::new(
                build_client(DATA_API_TIMEOUT)?,
                config.autodev_base_url.clone(),
                config.autodev_api_key.clone(),
            ),
            nhtsa: NhtsaClient::new(
                build_client(DATA_API_TIMEOUT)?,
                config.nhtsa_base_url.clone(),
            ),
            scraper: ExaClient::new(
                build_client(SCRAPE_TIMEOUT)?,
                config.exa_base_url.clone(),
                config.exa_api_key.clone(),
            ),
        })
    }
}

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))
}

/// Send a request to a named upstream, recording duration/error metrics,
/// and deserialize the JSON body. Non-2xx and transport failures both
/// surface as `AppError::Upstream`.
pub(crate) async fn execute_json<T: DeserializeOwned>(
    upstream: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let attrs = [KeyValue::new("upstream.name", upstream)];
    let started = Instant::now();

    let result = request.send().await;
    UPSTREAM_REQUEST_DURATION.record(started.elapsed().as_secs_f64(), &attrs);

    let response = result.map_err(|e| {
        UPSTREAM_ERROR_COUNT.add(1, &attrs);
        AppError::Upstream(format!("{upstream}: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        UPSTREAM_ERROR_COUNT.add(1, &attrs);
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!(
            "{upstream} returned {status}: {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    response.json::<T>().await.map_err(|e| {
        UPSTREAM_ERROR_COUNT.add(1, &attrs);
        AppError::Upstream(format!("{upstream} returned invalid JSON: {e}"))
    })
}
