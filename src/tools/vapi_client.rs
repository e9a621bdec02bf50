//! Thin HTTP client for the Vapi REST API.

use crate::errors::AppError;
use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArtifact {
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapiCall {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub call_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub artifact: Option<CallArtifact>,
    // Older payloads put these at the top level
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

impl VapiCall {
    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }

    pub fn type_label(&self) -> &str {
        self.call_type.as_deref().unwrap_or("unknown")
    }

    pub fn recording(&self) -> Option<&str> {
        self.artifact
            .as_ref()
            .and_then(|a| a.recording_url.as_deref())
            .or(self.recording_url.as_deref())
    }

    pub fn transcript_text(&self) -> Option<&str> {
        self.artifact
            .as_ref()
            .and_then(|a| a.transcript.as_deref())
            .or(self.transcript.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VapiAssistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VapiPhoneNumber {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
}

pub struct VapiClient {
    client: ReqwestClient,
    base_url: String,
}

impl VapiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );

        let client = ReqwestClient::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Join `segments` onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::ConfigError(format!("Invalid Vapi base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::NetworkError(format!(
                "Vapi API error: {} - {}",
                status, error_text
            ))
            .into());
        }
        Ok(response.json::<T>().await.map_err(AppError::from)?)
    }

    pub async fn create_call(&self, body: &Value) -> Result<VapiCall> {
        let response = self.client.post(self.endpoint(&["call"])?).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn get_call(&self, call_id: &str) -> Result<VapiCall> {
        let response = self
            .client
            .get(self.endpoint(&["call", call_id])?)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_calls(&self, limit: u32) -> Result<Vec<VapiCall>> {
        let response = self
            .client
            .get(self.endpoint(&["call"])?)
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn create_assistant(&self, body: &Value) -> Result<VapiAssistant> {
        let response = self
            .client
            .post(self.endpoint(&["assistant"])?)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_phone_numbers(&self) -> Result<Vec<VapiPhoneNumber>> {
        let response = self.client.get(self.endpoint(&["phone-number"])?).send().await?;
        Self::decode(response).await
    }
}
