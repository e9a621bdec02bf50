//! On-disk cache of Composio connected-account ids.
//!
//! The file is a flat JSON object `{ "<app slug>": "<connection id>" }` so a
//! user only has to finish an OAuth flow once per app.

use crate::errors::AppError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ConnectionStore {
    path: PathBuf,
}

impl ConnectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the cache. A missing or unreadable file yields an empty map.
    pub fn load(&self) -> HashMap<String, String> {
        if !self.path.exists() {
            return HashMap::new();
        }

        match fs::read_to_string(&self.path)
            .map_err(AppError::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(AppError::from))
        {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                HashMap::new()
            }
        }
    }

    /// Record `connection_id` for `app`. Returns `Ok(false)` if it was already stored.
    pub fn save(&self, app: &str, connection_id: &str) -> Result<bool, AppError> {
        let mut cache = self.load();
        if cache.get(app).map(String::as_str) == Some(connection_id) {
            return Ok(false);
        }
        cache.insert(app.to_string(), connection_id.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&cache)?)?;

        info!(
            "Stored persistent Composio connection for {} at {}",
            app,
            self.path.display()
        );
        Ok(true)
    }
}
