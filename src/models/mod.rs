//! Data models for the application.
//!
//! Board models live only in memory; `DailyReportResult` is stored in
//! SQLite and derives FromRow for SQLx queries.

pub mod board;
pub mod daily_report_result;
pub mod pipeline;

// Re-exports for convenient access
pub use board::{Board, BoardList, BoardState, Issue, IssueDetail, IssueProject, Label, User};
pub use daily_report_result::{DailyReportResult, ParamType, ReportKey};
pub use pipeline::{Job, Pipeline};
