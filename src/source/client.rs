use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::history::Reading;
use crate::source::models::{into_readings, LatestReadingsResponse};
use crate::source::ReadingSource;

pub struct SensorApiClient {
    http_client: Client,
    url: String,
}

impl SensorApiClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.source_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            url: config.sensor_api_url.clone(),
        })
    }

    /// Get the latest reading of every sensor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` if the request fails, returns an error
    /// status, or the body is not a readings array.
    pub async fn get_latest_readings(&self) -> AppResult<LatestReadingsResponse> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::Source(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Source(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Source(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse latest-readings response"
            );
            AppError::Source(format!("Failed to parse response: {e}"))
        })
    }
}

impl ReadingSource for SensorApiClient {
    async fn fetch_latest(&self) -> AppResult<Vec<Reading>> {
        let body = self.get_latest_readings().await?;
        into_readings(body)
    }
}
