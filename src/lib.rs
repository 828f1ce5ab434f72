//! GitLab board and report services.
//!
//! Two independent pieces share this crate:
//! - removing an issue from an issue board, with optimistic local updates
//!   that roll back when GitLab rejects the change;
//! - aggregating per-job coverage of completed pipelines into daily
//!   report results.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use config::AppConfig;
use db::pool::DbPool;
use error::AppError;
use services::{BoardIssueRemover, DailyReportResultService, GitLabClient};

/// Services wired up from an [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppContext {
    pub db: DbPool,
    pub gitlab: GitLabClient,
    pub board_issues: BoardIssueRemover,
    pub daily_reports: DailyReportResultService,
}

impl AppContext {
    /// Validate the configuration, open the database and build the services.
    pub async fn initialize(config: &AppConfig) -> Result<Self, AppError> {
        config.validate()?;

        let db = db::initialize_with(&config.database_path, &config.database_pool).await?;
        let gitlab = GitLabClient::new(config.gitlab.clone())?;

        log::info!(
            "[app] Initialized with database {} and GitLab {}",
            config.database_path.display(),
            config.gitlab.base_url
        );

        Ok(Self {
            daily_reports: DailyReportResultService::new(db.clone()),
            board_issues: BoardIssueRemover::new(config.issue_update_template.clone()),
            db,
            gitlab,
        })
    }
}
