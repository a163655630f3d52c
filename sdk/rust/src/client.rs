use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeResponse {
    pub timezone: String,
    pub current_time: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Error payload returned with 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub requested_timezone: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Debug)]
pub enum ClientError {
    Transport(reqwest::Error),
    /// The server answered with an error status.
    Api { status: StatusCode, body: ApiError },
    Decode(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "transport error: {}", e),
            ClientError::Api { status, body } => write!(f, "{} ({}): {}", body.error, status, body.message),
            ClientError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e)
    }
}

pub struct TimeClient {
    client: Client,
    base_url: String,
}

impl TimeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Service description (`GET /`).
    pub async fn index(&self) -> Result<serde_json::Value, ClientError> {
        self.get_json("/").await
    }

    pub async fn healthcheck(&self) -> Result<HealthResponse, ClientError> {
        self.get_json("/healthcheck").await
    }

    /// Current time in `timezone`, e.g. `"America/New_York"`.
    pub async fn get_time(&self, timezone: &str) -> Result<TimeResponse, ClientError> {
        self.get_json(&format!("/time/{}", timezone)).await
    }

    /// Raw GET for paths the typed methods do not cover.
    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.get(path).await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str::<ApiError>(&text)?;
            return Err(ClientError::Api { status, body });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
