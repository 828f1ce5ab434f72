//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::Router;
use gitlab_board_reports::db::pool::DbPool;
use tempfile::TempDir;

/// Open a fresh migrated database in a temporary directory.
///
/// The directory is returned so it outlives the pool.
pub async fn setup_test_db() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let pool = gitlab_board_reports::db::initialize(&db_path).await.unwrap();
    (dir, pool)
}

/// Serve a router on an ephemeral local port and return its base URL.
pub async fn spawn_gitlab(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
