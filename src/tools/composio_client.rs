//! Thin HTTP client for the Composio REST API.

use crate::errors::AppError;
use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct ComposioApp {
    #[serde(alias = "slug")]
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

impl ComposioApp {
    pub fn slug(&self) -> String {
        self.key.to_lowercase()
    }

    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposioAction {
    #[serde(alias = "slug", alias = "enum")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
    #[serde(default, rename = "appName")]
    pub app_name: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl ConnectedAccount {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("active"))
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionRequest {
    #[serde(rename = "redirectUrl", default)]
    pub redirect_url: Option<String>,
    #[serde(rename = "connectedAccountId", default)]
    pub connected_account_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<Value>,
    // Composio's field name is misspelled upstream; accept both
    #[serde(default, alias = "successfull")]
    pub successful: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    items: Vec<T>,
}

#[derive(Debug, Serialize)]
struct InitiateConnectionBody<'a> {
    #[serde(rename = "entityId")]
    entity_id: &'a str,
    #[serde(rename = "appName")]
    app_name: &'a str,
    #[serde(rename = "integrationId", skip_serializing_if = "Option::is_none")]
    integration_id: Option<&'a str>,
}

pub struct ComposioClient {
    client: ReqwestClient,
    base_url: String,
    entity_id: String,
}

impl ComposioClient {
    pub fn new(api_key: &str, base_url: &str, entity_id: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", HeaderValue::from_str(api_key)?);

        let client = ReqwestClient::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            entity_id: entity_id.to_string(),
        })
    }

    /// Join `segments` onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::ConfigError(format!("Invalid Composio base URL: {}", self.base_url))
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
                "Composio API error: {} - {}",
                status, error_text
            ))
            .into());
        }
        Ok(response.json::<T>().await.map_err(AppError::from)?)
    }

    pub async fn list_apps(&self) -> Result<Vec<ComposioApp>> {
        let response = self.client.get(self.endpoint(&["v1", "apps"])?).send().await?;
        Ok(Self::decode::<ItemList<ComposioApp>>(response).await?.items)
    }

    pub async fn list_actions(&self, app_slug: &str) -> Result<Vec<ComposioAction>> {
        let response = self
            .client
            .get(self.endpoint(&["v2", "actions"])?)
            .query(&[("apps", app_slug)])
            .send()
            .await?;
        Ok(Self::decode::<ItemList<ComposioAction>>(response)
            .await?
            .items)
    }

    pub async fn list_connections(&self) -> Result<Vec<ConnectedAccount>> {
        let response = self
            .client
            .get(self.endpoint(&["v1", "connectedAccounts"])?)
            .query(&[
                ("user_uuid", self.entity_id.as_str()),
                ("showActiveOnly", "true"),
            ])
            .send()
            .await?;
        Ok(Self::decode::<ItemList<ConnectedAccount>>(response)
            .await?
            .items)
    }

    pub async fn get_connection(&self, connection_id: &str) -> Result<ConnectedAccount> {
        let response = self
            .client
            .get(self.endpoint(&["v1", "connectedAccounts", connection_id])?)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn initiate_connection(
        &self,
        app_slug: &str,
        auth_config_id: Option<&str>,
    ) -> Result<ConnectionRequest> {
        let body = InitiateConnectionBody {
            entity_id: &self.entity_id,
            app_name: app_slug,
            integration_id: auth_config_id,
        };
        let response = self
            .client
            .post(self.endpoint(&["v1", "connectedAccounts"])?)
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn execute_action(
        &self,
        action_slug: &str,
        connection_id: &str,
        app_slug: &str,
        input: &Value,
    ) -> Result<ExecutionResponse> {
        debug!(action = action_slug, "executing Composio action");
        let body = json!({
            "connectedAccountId": connection_id,
            "entityId": self.entity_id,
            "appName": app_slug,
            "input": input,
        });
        let response = self
            .client
            .post(self.endpoint(&["v2", "actions", action_slug, "execute"])?)
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }
}
