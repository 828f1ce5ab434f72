//! Daily report aggregation.
//!
//! After a pipeline completes, the coverage of each of its jobs is written
//! to `ci_daily_report_results`, one row per job group and day. Rows are
//! upserted: a later execution for the same key overwrites `value` and
//! `last_pipeline_id`, even when it belongs to an older pipeline.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::daily_report_result::ParamType;
use crate::models::pipeline::Pipeline;
use crate::services::gitlab_client::GitLabClient;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

/// A value about to be written for one job group.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub title: String,
    pub value: f64,
}

/// Collect coverage entries for a pipeline, one per job group.
///
/// Jobs without coverage are skipped. When several jobs share a group name
/// the last one in job order wins, keeping the position of the first.
pub fn coverage_entries(pipeline: &Pipeline) -> Vec<ReportEntry> {
    let mut entries: Vec<ReportEntry> = Vec::new();

    for (job, coverage) in pipeline.jobs_with_coverage() {
        let title = job.group_name();
        match entries.iter_mut().find(|entry| entry.title == title) {
            Some(existing) => existing.value = coverage,
            None => entries.push(ReportEntry {
                title,
                value: coverage,
            }),
        }
    }

    entries
}

/// Writes daily report results for completed pipelines.
#[derive(Debug, Clone)]
pub struct DailyReportResultService {
    pool: DbPool,
}

impl DailyReportResultService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upsert the coverage rows for a pipeline.
    ///
    /// # Returns
    /// Number of rows written. Zero when no job reported coverage, in which
    /// case the database is not touched.
    pub async fn execute(&self, pipeline: &Pipeline) -> Result<u64, AppError> {
        let entries = coverage_entries(pipeline);
        if entries.is_empty() {
            log::debug!(
                "[daily-report] Pipeline {} has no jobs with coverage",
                pipeline.id
            );
            return Ok(0);
        }

        let ref_path = pipeline.source_ref_path();
        let date = pipeline.report_date();

        let written = upsert_entries(
            &self.pool,
            pipeline.project_id,
            pipeline.id,
            &ref_path,
            ParamType::Coverage,
            date,
            &entries,
        )
        .await?;

        log::info!(
            "[daily-report] Pipeline {} wrote {} {} result(s) for {} on {}",
            pipeline.id,
            written,
            ParamType::Coverage,
            ref_path,
            date
        );

        Ok(written)
    }

    /// Fetch a pipeline and its jobs from GitLab, then run [`Self::execute`].
    pub async fn execute_remote(
        &self,
        client: &GitLabClient,
        project_id: i64,
        pipeline_id: i64,
    ) -> Result<u64, AppError> {
        let pipeline = client.fetch_pipeline_with_jobs(project_id, pipeline_id).await?;
        self.execute(&pipeline).await
    }
}

/// Insert or update every entry in a single statement keyed by
/// (project_id, ref_path, param_type, date, title).
async fn upsert_entries(
    pool: &DbPool,
    project_id: i64,
    pipeline_id: i64,
    ref_path: &str,
    param_type: ParamType,
    date: NaiveDate,
    entries: &[ReportEntry],
) -> Result<u64, AppError> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT INTO ci_daily_report_results (project_id, last_pipeline_id, ref_path, param_type, title, date, value) ",
    );

    builder.push_values(entries, |mut row, entry| {
        row.push_bind(project_id)
            .push_bind(pipeline_id)
            .push_bind(ref_path)
            .push_bind(param_type.as_str())
            .push_bind(entry.title.as_str())
            .push_bind(date)
            .push_bind(entry.value);
    });

    builder.push(
        " ON CONFLICT (project_id, ref_path, param_type, date, title) DO UPDATE SET \
         value = excluded.value, last_pipeline_id = excluded.last_pipeline_id",
    );

    let result = builder
        .build()
        .execute(pool)
        .await
        .map_err(|e| AppError::database_with_op(e.to_string(), "upsert_daily_report_results"))?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pipeline::Job;
    use chrono::{TimeZone, Utc};

    fn job(id: i64, name: &str, coverage: Option<f64>) -> Job {
        Job {
            id,
            name: name.to_string(),
            coverage,
        }
    }

    fn pipeline(jobs: Vec<Job>) -> Pipeline {
        Pipeline {
            id: 1,
            project_id: 1,
            ref_name: "main".to_string(),
            tag: false,
            created_at: Utc.with_ymd_and_hms(2020, 2, 6, 0, 1, 10).unwrap(),
            jobs,
        }
    }

    #[test]
    fn test_coverage_entries_skip_jobs_without_coverage() {
        let entries = coverage_entries(&pipeline(vec![
            job(1, "3/3 rspec", Some(80.0)),
            job(2, "2/2 karma", Some(90.0)),
            job(3, "extra", None),
        ]));

        assert_eq!(
            entries,
            vec![
                ReportEntry {
                    title: "rspec".to_string(),
                    value: 80.0
                },
                ReportEntry {
                    title: "karma".to_string(),
                    value: 90.0
                },
            ]
        );
    }

    #[test]
    fn test_coverage_entries_last_shard_wins() {
        let entries = coverage_entries(&pipeline(vec![
            job(1, "1/3 rspec", Some(70.0)),
            job(2, "karma", Some(90.0)),
            job(3, "3/3 rspec", Some(75.5)),
        ]));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "rspec");
        assert_eq!(entries[0].value, 75.5);
    }

    #[test]
    fn test_coverage_entries_empty() {
        assert!(coverage_entries(&pipeline(vec![job(1, "foo", None)])).is_empty());
        assert!(coverage_entries(&pipeline(vec![])).is_empty());
    }
}
