//! Application configuration.
//!
//! Settings are read from a JSON file. Missing fields fall back to their
//! defaults, so a file only needs to name what differs.

use crate::db::{self, pool::PoolSettings};
use crate::error::AppError;
use crate::services::board_issue::PROJECT_PATH_PLACEHOLDER;
use crate::services::gitlab_client::GitLabClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default issue update URL template.
pub const DEFAULT_ISSUE_UPDATE_TEMPLATE: &str = "/:project_path/-/issues/:iid.json";

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GitLab connection.
    pub gitlab: GitLabClientConfig,

    /// SQLite file holding daily report results. Defaults to
    /// `board-reports.db` in the working directory.
    pub database_path: PathBuf,

    /// Pool limits for the report database.
    pub database_pool: PoolSettings,

    /// URL template used to PATCH issues removed from a board.
    pub issue_update_template: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gitlab: GitLabClientConfig::default(),
            database_path: db::get_db_path(Path::new(".")),
            database_pool: PoolSettings::default(),
            issue_update_template: DEFAULT_ISSUE_UPDATE_TEMPLATE.to_string(),
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file and validate them.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Parse settings from a JSON string and validate them.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| AppError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would otherwise only fail at request time.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.gitlab.base_url.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "GitLab base URL is required",
                "gitlab.base_url",
            ));
        }

        if !self.issue_update_template.contains(PROJECT_PATH_PLACEHOLDER) {
            return Err(AppError::invalid_input_field(
                format!("Template must contain {}", PROJECT_PATH_PLACEHOLDER),
                "issue_update_template",
            ));
        }

        if self.gitlab.timeout_secs == 0 {
            return Err(AppError::invalid_input_field(
                "Timeout must be at least one second",
                "gitlab.timeout_secs",
            ));
        }

        Ok(())
    }
}
