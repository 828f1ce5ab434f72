//! Daily report result model and queries.

use crate::db::pool::DbPool;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Kind of value aggregated into a daily report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Coverage,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coverage => "coverage",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated value per (project, ref path, param type, date, title).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailyReportResult {
    pub id: i64,

    pub project_id: i64,

    /// Pipeline that most recently wrote this row.
    pub last_pipeline_id: i64,

    /// Fully-qualified ref (e.g., `refs/heads/main`).
    pub ref_path: String,

    /// Stored form of [`ParamType`].
    pub param_type: String,

    /// Job group name.
    pub title: String,

    pub date: NaiveDate,

    pub value: f64,
}

/// Natural key of a daily report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportKey<'a> {
    pub project_id: i64,
    pub ref_path: &'a str,
    pub param_type: ParamType,
    pub date: NaiveDate,
    pub title: &'a str,
}

const SELECT_COLUMNS: &str =
    "SELECT id, project_id, last_pipeline_id, ref_path, param_type, title, date, value FROM ci_daily_report_results";

/// Look up a row by its natural key.
pub async fn find_by_key(
    pool: &DbPool,
    key: &ReportKey<'_>,
) -> Result<Option<DailyReportResult>, sqlx::Error> {
    let sql = format!(
        "{} WHERE project_id = ? AND ref_path = ? AND param_type = ? AND date = ? AND title = ?",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, DailyReportResult>(&sql)
        .bind(key.project_id)
        .bind(key.ref_path)
        .bind(key.param_type.as_str())
        .bind(key.date)
        .bind(key.title)
        .fetch_optional(pool)
        .await
}

/// Look up the first row with the given title (lowest ID).
pub async fn find_by_title(
    pool: &DbPool,
    title: &str,
) -> Result<Option<DailyReportResult>, sqlx::Error> {
    let sql = format!("{} WHERE title = ? ORDER BY id ASC LIMIT 1", SELECT_COLUMNS);
    sqlx::query_as::<_, DailyReportResult>(&sql)
        .bind(title)
        .fetch_optional(pool)
        .await
}

/// List rows for a project ref within an inclusive date range.
/// Newest day first, then by title.
pub async fn list_for_ref(
    pool: &DbPool,
    project_id: i64,
    ref_path: &str,
    param_type: ParamType,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<DailyReportResult>, sqlx::Error> {
    let sql = format!(
        "{} WHERE project_id = ? AND ref_path = ? AND param_type = ? AND date BETWEEN ? AND ? ORDER BY date DESC, title ASC",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, DailyReportResult>(&sql)
        .bind(project_id)
        .bind(ref_path)
        .bind(param_type.as_str())
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await
}

/// Count all stored rows.
pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM ci_daily_report_results")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_test_db() -> DbPool {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        // Keep the dir alive by leaking it (for test purposes)
        std::mem::forget(dir);

        let pool = crate::db::initialize(&db_path).await.unwrap();

        for (title, date, value) in [
            ("rspec", "2020-02-05", 70.0),
            ("rspec", "2020-02-06", 80.0),
            ("karma", "2020-02-06", 90.0),
            ("karma", "2020-02-09", 91.0),
        ] {
            sqlx::query(
                r#"INSERT INTO ci_daily_report_results
                (project_id, last_pipeline_id, ref_path, param_type, title, date, value)
                VALUES (1, 10, 'refs/heads/main', 'coverage', ?, ?, ?)"#,
            )
            .bind(title)
            .bind(date)
            .bind(value)
            .execute(&pool)
            .await
            .unwrap();
        }

        pool
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 2, d).unwrap()
    }

    #[test]
    fn test_param_type_display() {
        assert_eq!(ParamType::Coverage.to_string(), "coverage");
        assert_eq!(
            serde_json::to_string(&ParamType::Coverage).unwrap(),
            "\"coverage\""
        );
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let pool = setup_test_db().await;

        let found = find_by_key(
            &pool,
            &ReportKey {
                project_id: 1,
                ref_path: "refs/heads/main",
                param_type: ParamType::Coverage,
                date: day(6),
                title: "karma",
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(found.value, 90.0);
        assert_eq!(found.date, day(6));
        assert_eq!(found.param_type, "coverage");

        let missing = find_by_key(
            &pool,
            &ReportKey {
                project_id: 2,
                ref_path: "refs/heads/main",
                param_type: ParamType::Coverage,
                date: day(6),
                title: "karma",
            },
        )
        .await
        .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_for_ref_filters_date_range() {
        let pool = setup_test_db().await;

        let rows = list_for_ref(&pool, 1, "refs/heads/main", ParamType::Coverage, day(5), day(6))
            .await
            .unwrap();

        let summary: Vec<(NaiveDate, &str)> =
            rows.iter().map(|r| (r.date, r.title.as_str())).collect();
        assert_eq!(
            summary,
            vec![(day(6), "karma"), (day(6), "rspec"), (day(5), "rspec")]
        );
    }

    #[tokio::test]
    async fn test_unique_natural_key() {
        let pool = setup_test_db().await;

        let duplicate = sqlx::query(
            r#"INSERT INTO ci_daily_report_results
            (project_id, last_pipeline_id, ref_path, param_type, title, date, value)
            VALUES (1, 11, 'refs/heads/main', 'coverage', 'rspec', '2020-02-06', 1.0)"#,
        )
        .execute(&pool)
        .await;

        assert!(duplicate.is_err());
        assert_eq!(count(&pool).await.unwrap(), 4);
    }
}
