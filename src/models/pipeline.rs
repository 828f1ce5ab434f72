//! Pipeline and job read models used by report aggregation.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Ref prefix for branch pipelines.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Ref prefix for tag pipelines.
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// A completed pipeline and its jobs, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: i64,

    pub project_id: i64,

    /// Short ref name (branch or tag).
    #[serde(rename = "ref")]
    pub ref_name: String,

    /// Whether the pipeline ran for a tag.
    #[serde(default)]
    pub tag: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl Pipeline {
    /// Fully-qualified ref the pipeline ran against.
    pub fn source_ref_path(&self) -> String {
        let prefix = if self.tag {
            TAG_REF_PREFIX
        } else {
            BRANCH_REF_PREFIX
        };
        format!("{}{}", prefix, self.ref_name)
    }

    /// Calendar day (UTC) the pipeline was created on.
    pub fn report_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Jobs that reported a coverage value, in order.
    pub fn jobs_with_coverage(&self) -> impl Iterator<Item = (&Job, f64)> + '_ {
        self.jobs
            .iter()
            .filter_map(|job| job.coverage.map(|coverage| (job, coverage)))
    }
}

/// A pipeline job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,

    pub name: String,

    /// Coverage percentage parsed from the job log, if any.
    pub coverage: Option<f64>,
}

impl Job {
    /// Job name with parallel shard markers such as `2/5` removed.
    pub fn group_name(&self) -> String {
        group_name(&self.name)
    }
}

fn shard_marker() -> &'static Regex {
    static SHARD_MARKER: OnceLock<Regex> = OnceLock::new();
    SHARD_MARKER.get_or_init(|| Regex::new(r"\d+[\s:/\\]+\d+\s*").expect("valid shard regex"))
}

/// Collapse a job name to its group name.
///
/// Parallel jobs are named like `rspec 3/5` or `3/5 rspec`; every such
/// `N/M` marker (also `N:M`, `N\M`, `N M`) is stripped so the shards share
/// one title.
pub fn group_name(name: &str) -> String {
    shard_marker().replace_all(name, "").trim().to_string()
}
