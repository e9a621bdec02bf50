//! Composio meta-tool: discover apps, inspect their actions, run an action.

use crate::config::ComposioConfig;
use crate::errors::AppError;
use crate::tools::composio_client::{ComposioApp, ComposioClient, ExecutionResponse};
use crate::tools::connections::ConnectionStore;
use crate::tools::ToolOutput;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const MAX_LISTED_ACTIONS: usize = 10;

pub const NOT_INITIALIZED: &str =
    "Composio is not properly initialized. Please set COMPOSIO_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposioParams {
    pub action: String,
    pub query: Option<String>,
    pub tool_name: Option<String>,
    pub action_name: Option<String>,
    pub parameters: Option<Value>,
}

pub struct ComposioTool {
    client: Option<ComposioClient>,
    store: ConnectionStore,
    auth_config_ids: HashMap<String, String>,
    saved_connections: Mutex<HashMap<String, String>>,
    apps_cache: Mutex<Option<Vec<ComposioApp>>>,
}

impl ComposioTool {
    pub fn new(config: &ComposioConfig) -> Self {
        let store = ConnectionStore::new(config.connection_store.clone());

        // Env-supplied ids are the fallback; the on-disk cache wins
        let mut saved = config.connection_ids.clone();
        saved.extend(store.load());

        let client = match config.api_key.as_deref() {
            None => {
                warn!(
                    "COMPOSIO_API_KEY not found in environment. \
                     Composio tool will not be functional. Get your key at https://app.composio.dev"
                );
                None
            }
            Some(key) => match ComposioClient::new(key, &config.base_url, &config.entity_id) {
                Ok(client) => {
                    info!("Composio client initialized");
                    Some(client)
                }
                Err(e) => {
                    error!("Failed to initialize Composio: {}", e);
                    None
                }
            },
        };

        Self {
            client,
            store,
            auth_config_ids: config.auth_config_ids.clone(),
            saved_connections: Mutex::new(saved),
            apps_cache: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn execute(&self, params: &ComposioParams) -> ToolOutput {
        let Some(client) = &self.client else {
            return ToolOutput::failure(NOT_INITIALIZED);
        };

        match params.action.as_str() {
            "list_tools" => self
                .list_tools(client, params.query.as_deref())
                .await
                .unwrap_or_else(|e| ToolOutput::failure(format!("Failed to list tools: {}", e))),
            "get_tool_info" => match params.tool_name.as_deref() {
                Some(name) if !name.is_empty() => self
                    .get_tool_info(client, name)
                    .await
                    .unwrap_or_else(|e| {
                        ToolOutput::failure(format!("Failed to get tool info: {}", e))
                    }),
                _ => ToolOutput::failure("tool_name is required for get_tool_info action"),
            },
            "execute" => self.execute_action(client, params).await.unwrap_or_else(|e| {
                error!("Failed to execute tool action: {}", e);
                ToolOutput::failure(format!("Execution failed: {}", e))
            }),
            other => ToolOutput::failure(format!("Unknown action: {}", other)),
        }
    }

    /// Drop cached vendor state so the next call refetches it.
    pub async fn reset(&self) {
        *self.apps_cache.lock().await = None;
    }

    async fn apps(&self, client: &ComposioClient) -> Result<Vec<ComposioApp>> {
        let mut cache = self.apps_cache.lock().await;
        if let Some(apps) = cache.as_ref() {
            return Ok(apps.clone());
        }
        let apps = client.list_apps().await?;
        *cache = Some(apps.clone());
        Ok(apps)
    }

    async fn find_app(&self, client: &ComposioClient, tool_name: &str) -> Result<Option<ComposioApp>> {
        let wanted = tool_name.to_lowercase();
        Ok(self
            .apps(client)
            .await?
            .into_iter()
            .find(|app| app.slug() == wanted))
    }

    async fn list_tools(&self, client: &ComposioClient, query: Option<&str>) -> Result<ToolOutput> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let needle = query.map(str::to_lowercase);

        let mut matches: Vec<(String, String, &'static str)> = self
            .apps(client)
            .await?
            .iter()
            .map(|app| (app.slug(), app.label().to_string(), categorize_app(&app.slug())))
            .filter(|(slug, label, category)| match &needle {
                Some(q) => {
                    slug.contains(q.as_str())
                        || label.to_lowercase().contains(q.as_str())
                        || category.to_lowercase().contains(q.as_str())
                }
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        if matches.is_empty() {
            return Ok(ToolOutput::success("No tools found matching your query"));
        }

        let mut output = format!("Found {} tools", matches.len());
        if let Some(q) = query {
            output.push_str(&format!(" matching '{}'", q));
        }
        output.push_str(":\n\n");

        let mut by_category: BTreeMap<&str, Vec<(String, String)>> = BTreeMap::new();
        for (slug, label, category) in matches {
            by_category.entry(category).or_default().push((slug, label));
        }
        for (category, apps) in by_category {
            output.push_str(&format!("\n{}:\n", category));
            for (slug, label) in apps {
                output.push_str(&format!("  - {} ({})\n", slug, label));
            }
        }
        output.push_str("\n\nUse get_tool_info to learn more about a specific tool.");

        Ok(ToolOutput::success(output))
    }

    async fn get_tool_info(&self, client: &ComposioClient, tool_name: &str) -> Result<ToolOutput> {
        let Some(app) = self.find_app(client, tool_name).await? else {
            return Ok(ToolOutput::failure(format!("Tool '{}' not found", tool_name)));
        };
        let slug = app.slug();
        let prefix = format!("{}_", app.key.to_uppercase());

        let actions: Vec<(String, String)> = client
            .list_actions(&slug)
            .await?
            .into_iter()
            .filter_map(|action| {
                let short = short_action_name(&prefix, &action.name)?;
                Some((short, action_description(&action.name)))
            })
            .collect();

        let mut output = format!("Tool: {} ({})\n", app.label(), app.key);
        output.push_str(&format!("Category: {}\n\n", categorize_app(&slug)));

        if actions.is_empty() {
            output.push_str("No actions found for this tool.\n");
        } else {
            output.push_str(&format!("Available Actions ({}):\n", actions.len()));
            for (name, description) in actions.iter().take(MAX_LISTED_ACTIONS) {
                output.push_str(&format!("  - {}: {}\n", name, description));
            }
            if actions.len() > MAX_LISTED_ACTIONS {
                output.push_str(&format!(
                    "  ... and {} more actions\n",
                    actions.len() - MAX_LISTED_ACTIONS
                ));
            }
        }

        output.push_str(&format!(
            "\n\nTo execute an action, use: {{\"action\": \"execute\", \"tool_name\": \"{}\", \"action_name\": \"<action>\", \"parameters\": {{...}}}}",
            slug
        ));

        Ok(ToolOutput::success(output))
    }

    async fn execute_action(&self, client: &ComposioClient, params: &ComposioParams) -> Result<ToolOutput> {
        let (Some(tool_name), Some(action_name)) = (
            params.tool_name.as_deref().filter(|s| !s.is_empty()),
            params.action_name.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Ok(ToolOutput::failure(
                "Both tool_name and action_name are required for execute action",
            ));
        };

        let Some(app) = self.find_app(client, tool_name).await? else {
            return Ok(ToolOutput::failure(format!("Tool '{}' not found", tool_name)));
        };
        let slug = app.slug();

        let action_slug = full_action_slug(&app.key, action_name);
        let known = client
            .list_actions(&slug)
            .await?
            .into_iter()
            .any(|action| action.name.eq_ignore_ascii_case(&action_slug));
        if !known {
            return Ok(ToolOutput::failure(format!(
                "Action '{}' not found for tool '{}'",
                action_name, tool_name
            )));
        }

        let Some(connection_id) = self.resolve_connection(client, &slug).await? else {
            let redirect = self.start_authentication(client, &slug).await?;
            return Ok(ToolOutput::success(format!(
                "Authentication required for {}.\n\n\
                 Please visit the following URL **once** to authorize access, then rerun the command:\n{}\n\n\
                 Future runs will pick up the saved connection automatically.",
                app.label(),
                redirect
            )));
        };

        let input = params
            .parameters
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()));
        info!("Executing {} with parameters: {}", action_slug, input);
        let response = client
            .execute_action(&action_slug, &connection_id, &slug, &input)
            .await?;

        if let Some(message) = execution_error(&response) {
            return Ok(ToolOutput::failure(message));
        }

        if is_empty_data(&response.data) {
            // Empty payloads usually mean the grant lacks a scope
            return Ok(match self.start_authentication(client, &slug).await {
                Ok(redirect) => ToolOutput::success(format!(
                    "Additional authentication or permissions are required for {}.\n\n\
                     Please visit the following URL to authorize access, then rerun the command:\n{}\n\n\
                     Future runs will automatically use the upgraded connection.",
                    app.label(),
                    redirect
                )),
                Err(_) => ToolOutput::failure(
                    "Action returned no data and could not trigger re-authentication.",
                ),
            });
        }

        Ok(ToolOutput::success(match &response.data {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other)?,
        }))
    }

    /// Find a usable connected account: live ones first, then the cached id.
    async fn resolve_connection(&self, client: &ComposioClient, slug: &str) -> Result<Option<String>> {
        let live = client.list_connections().await?;
        let mut saved = self.saved_connections.lock().await;

        for conn in &live {
            let app = conn.app_name.to_lowercase();
            if app.is_empty() {
                continue;
            }
            if let Err(e) = self.store.save(&app, &conn.id) {
                warn!("Could not persist connection cache: {}", e);
            }
            saved.insert(app, conn.id.clone());
        }

        if let Some(conn) = live
            .iter()
            .find(|c| c.app_name.eq_ignore_ascii_case(slug) && c.is_active())
        {
            return Ok(Some(conn.id.clone()));
        }

        let Some(cached) = saved.get(slug).cloned() else {
            return Ok(None);
        };
        match client.get_connection(&cached).await {
            Ok(conn) if conn.is_active() => Ok(Some(conn.id)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(
                    "Failed to attach cached connection {} for {}: {}",
                    cached, slug, e
                );
                Ok(None)
            }
        }
    }

    async fn start_authentication(&self, client: &ComposioClient, slug: &str) -> Result<String> {
        let auth_config = self.auth_config_ids.get(slug).map(String::as_str);
        let request = client.initiate_connection(slug, auth_config).await?;

        if let Some(id) = &request.connected_account_id {
            self.saved_connections
                .lock()
                .await
                .insert(slug.to_string(), id.clone());
            if let Err(e) = self.store.save(slug, id) {
                warn!("Could not persist connection cache: {}", e);
            }
        }

        request
            .redirect_url
            .ok_or_else(|| {
                AppError::ToolError("Composio did not return an authorization URL".to_string())
                    .into()
            })
    }
}

fn execution_error(response: &ExecutionResponse) -> Option<String> {
    match &response.error {
        Some(Value::Null) | None => {}
        Some(Value::String(s)) if s.is_empty() => {}
        Some(Value::String(s)) => return Some(s.clone()),
        Some(other) => return Some(other.to_string()),
    }
    if response.successful == Some(false) {
        return Some("Composio reported the action as unsuccessful".to_string());
    }
    None
}

fn is_empty_data(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// `github` + `create_issue` -> `GITHUB_CREATE_ISSUE`. Already-qualified names pass through.
pub fn full_action_slug(app_key: &str, action_name: &str) -> String {
    let prefix = format!("{}_", app_key.to_uppercase());
    let action = action_name.to_uppercase();
    if action.starts_with(&prefix) {
        action
    } else {
        format!("{}{}", prefix, action)
    }
}

/// `GITHUB_CREATE_ISSUE` under prefix `GITHUB_` -> `create_issue`
pub fn short_action_name(prefix: &str, action_slug: &str) -> Option<String> {
    action_slug
        .to_uppercase()
        .strip_prefix(prefix)
        .map(str::to_lowercase)
}

/// `GITHUB_CREATE_ISSUE` -> `create issue`
pub fn action_description(action_slug: &str) -> String {
    action_slug
        .split('_')
        .skip(1)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn categorize_app(slug: &str) -> &'static str {
    let app = slug.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| app.contains(n));

    if any(&["github", "gitlab", "bitbucket", "git"]) {
        "Development"
    } else if any(&["gmail", "outlook", "sendgrid", "mailchimp"]) {
        "Email & Communication"
    } else if any(&["slack", "discord", "teams", "zoom"]) {
        "Messaging & Collaboration"
    } else if any(&["notion", "airtable", "monday", "asana", "trello"]) {
        "Productivity & Project Management"
    } else if any(&["google", "calendar", "sheets", "docs", "drive"]) {
        "Google Workspace"
    } else if any(&["twitter", "linkedin", "facebook", "instagram"]) {
        "Social Media"
    } else if any(&["stripe", "paypal", "square"]) {
        "Payments & Finance"
    } else if any(&["aws", "azure", "gcp", "heroku"]) {
        "Cloud Services"
    } else if any(&["jira", "confluence", "atlassian"]) {
        "Atlassian Suite"
    } else if any(&["hubspot", "salesforce", "pipedrive"]) {
        "CRM & Sales"
    } else {
        "Other Integrations"
    }
}
