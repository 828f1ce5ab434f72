//! Business logic services.
//!
//! Services are independent of any particular UI host: board state is passed
//! in explicitly and report results go through the database pool.

pub mod board_issue;
pub mod daily_report;
pub mod flash;
pub mod gitlab_client;

pub use board_issue::{BoardIssueRemover, IssueUpdater, PendingRemoval, RemovedIssue};
pub use daily_report::DailyReportResultService;
pub use flash::{Flash, FlashLevel, FlashQueue, FlashSink};
pub use gitlab_client::GitLabClient;
