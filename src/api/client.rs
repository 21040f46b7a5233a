use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{ApiConfig, Config};
use crate::sync::SyncQueueEntry;

use super::{ApiError, InitialData, RemoteApi};

const INITIAL_DATA_PATH: &str = "/api/initial-data";

/// reqwest-backed client for the ledger backend.
#[derive(Clone)]
pub struct HttpApi {
  client: reqwest::Client,
  base_url: Url,
  token: String,
}

impl HttpApi {
  /// Build a client from config, reading the token from the environment.
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    Self::with_token(&config.api, token)
  }

  pub fn with_token(api: &ApiConfig, token: impl Into<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(api.timeout_secs))
      .gzip(true)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let base_url = parse_base_url(&api.url)?;

    Ok(Self {
      client,
      base_url,
      token: token.into(),
    })
  }

  /// Resolve an API path against the base URL, keeping any base path prefix.
  fn endpoint_url(&self, path: &str) -> Result<Url, ApiError> {
    Ok(self.base_url.join(path.trim_start_matches('/'))?)
  }

  async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response
      .text()
      .await
      .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ApiError::Status {
      status: status.as_u16(),
      body,
    })
  }
}

fn parse_base_url(raw: &str) -> Result<Url> {
  let mut url = Url::parse(raw).map_err(|e| eyre!("Invalid API url {}: {}", raw, e))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}

#[async_trait]
impl RemoteApi for HttpApi {
  async fn push_entry(&self, path: &str, entry: &SyncQueueEntry) -> Result<(), ApiError> {
    let url = self.endpoint_url(path)?;
    debug!(%url, id = %entry.id, action = %entry.action, "Submitting sync entry");

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.token)
      .json(entry)
      .send()
      .await?;

    Self::check(response).await?;
    Ok(())
  }

  async fn fetch_initial_data(&self) -> Result<InitialData, ApiError> {
    let url = self.endpoint_url(INITIAL_DATA_PATH)?;
    debug!(%url, "Fetching initial data");

    let response = self
      .client
      .get(url)
      .bearer_auth(&self.token)
      .send()
      .await?;

    let data = Self::check(response).await?.json::<InitialData>().await?;
    Ok(data)
  }
}
