use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{coerce, NumericSeries};
use crate::error::{CoreError, Result, ValidationError};
use crate::storage::ApiConfig;

/// Source of the control-value series driving the flame.
///
/// Failures are returned unchanged; providers never retry.
pub trait SeriesProvider: Send + Sync {
    fn fetch_series(&self) -> impl Future<Output = Result<NumericSeries>> + Send;
}

/// Series stored as JSON on disk (bare array or `{ "values": [...] }`).
#[derive(Debug, Clone)]
pub struct FileSeries {
    path: PathBuf,
}

impl FileSeries {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SeriesProvider for FileSeries {
    fn fetch_series(&self) -> impl Future<Output = Result<NumericSeries>> + Send {
        let path = self.path.clone();
        async move {
            let content = tokio::fs::read_to_string(&path).await?;
            let payload: Value = serde_json::from_str(&content)?;
            NumericSeries::from_payload(&payload).ok_or_else(|| {
                CoreError::Custom(format!("{} does not contain a value array", path.display()))
            })
        }
    }
}

/// HTTP client for the values and time endpoints of the game backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    values_url: Url,
    time_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| invalid_url(&config.base_url, e))?;
        let values_url = base
            .join(&config.values_path)
            .map_err(|e| invalid_url(&config.values_path, e))?;
        let time_url = base
            .join(&config.time_path)
            .map_err(|e| invalid_url(&config.time_path, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            values_url,
            time_url,
        })
    }

    pub fn values_url(&self) -> &Url {
        &self.values_url
    }

    /// Fetch the session duration in seconds.
    ///
    /// Accepts a bare number (or numeric string), or an object carrying it
    /// under `time`, `duration` or `data`.
    pub async fn fetch_time(&self) -> Result<u64> {
        let payload = self.get_json(&self.time_url).await?;
        let raw = match &payload {
            Value::Object(map) => ["time", "duration", "data"]
                .iter()
                .find_map(|k| map.get(*k))
                .cloned()
                .unwrap_or(Value::Null),
            other => other.clone(),
        };
        let secs = coerce(&raw);
        if secs <= 0.0 {
            return Err(CoreError::Custom(format!(
                "time endpoint returned no usable duration: {payload}"
            )));
        }
        Ok(secs.floor() as u64)
    }

    async fn get_json(&self, url: &Url) -> Result<Value> {
        tracing::debug!(%url, "fetching");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

impl SeriesProvider for ApiClient {
    fn fetch_series(&self) -> impl Future<Output = Result<NumericSeries>> + Send {
        async move {
            let payload = self.get_json(&self.values_url).await?;
            let series = NumericSeries::from_payload(&payload).ok_or_else(|| {
                CoreError::Custom(format!("{} did not return a value array", self.values_url))
            })?;
            tracing::info!(len = series.len(), "fetched control values");
            Ok(series)
        }
    }
}

fn invalid_url(raw: &str, err: url::ParseError) -> CoreError {
    ValidationError::InvalidValue {
        field: "api url".into(),
        message: format!("{raw}: {err}"),
    }
    .into()
}
