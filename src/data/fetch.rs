//! One-shot download of the raw atlas CSV.
//!
//! The body is parsed as CSV, so the URL must point at a CSV export of the
//! atlas HEALTH sheet rather than the published `.xls` workbook.
//!
//! The request is blocking and never retried: a failure aborts the offline
//! run, which can simply be started again.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::config::{ENV_DATA_URL, Settings};
use crate::error::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct AtlasClient {
    client: Client,
    url: String,
}

impl AtlasClient {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::new(2, format!("Unsupported data URL '{url}' (expected http/https).")));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    /// Use `--url` if given, otherwise the configured data URL.
    pub fn from_settings(url: Option<String>, settings: &Settings) -> Result<Self, AppError> {
        let url = url
            .or_else(|| settings.data_url.clone())
            .ok_or_else(|| AppError::new(2, format!("No data URL: pass --url or set {ENV_DATA_URL} (.env).")))?;
        Self::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the raw CSV body. Content is not sniffed; a workbook fails later at structuring.
    pub fn fetch_raw(&self) -> Result<Vec<u8>, AppError> {
        info!(url = %self.url, "fetching raw atlas data");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::new(4, format!("Data request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Data request failed with status {}.", resp.status()),
            ));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| AppError::new(4, format!("Failed to read data response: {e}")))?;
        info!(bytes = bytes.len(), "raw atlas data downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        let err = AtlasClient::new("ftp://example.org/atlas.csv").err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn flag_wins_over_settings() {
        let settings = Settings {
            artifact_dir: "models".into(),
            data_url: Some("https://example.org/from-env.csv".into()),
            output_dir: "data".into(),
        };
        let client = AtlasClient::from_settings(Some("https://example.org/flag.csv".into()), &settings).unwrap();
        assert_eq!(client.url(), "https://example.org/flag.csv");

        let client = AtlasClient::from_settings(None, &settings).unwrap();
        assert_eq!(client.url(), "https://example.org/from-env.csv");
    }

    #[test]
    fn missing_url_is_a_usage_error() {
        let settings = Settings {
            artifact_dir: "models".into(),
            data_url: None,
            output_dir: "data".into(),
        };
        let err = AtlasClient::from_settings(None, &settings).err().unwrap();
        assert!(err.to_string().contains(ENV_DATA_URL));
    }
}
