//! GitLab API client.
//!
//! Provides an HTTP client for GitLab API v4 reads (pipelines, jobs) and
//! for the web issue update endpoint used by boards.

use crate::error::AppError;
use crate::models::pipeline::{Job, Pipeline};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitLab API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLabClientConfig {
    /// Base URL of the GitLab instance (e.g., `https://gitlab.com`).
    pub base_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitLabClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// GitLab API client.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
    config: GitLabClientConfig,
}

/// Pagination information from GitLab API response headers.
#[derive(Debug, Clone, Default)]
pub struct PaginationInfo {
    /// Current page number.
    pub page: u32,

    /// Total number of pages.
    pub total_pages: u32,

    /// Next page number (if any).
    pub next_page: Option<u32>,
}

impl PaginationInfo {
    /// Page to request next, if any.
    ///
    /// Falls back to `x-page`/`x-total-pages` when `x-next-page` is
    /// missing or empty.
    pub fn following_page(&self) -> Option<u32> {
        match self.next_page {
            Some(next) => Some(next),
            None if self.page < self.total_pages => Some(self.page + 1),
            None => None,
        }
    }
}

/// GitLab pipeline from API (GET /projects/:id/pipelines/:pipeline_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabPipeline {
    pub id: i64,
    pub project_id: i64,
    pub status: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub tag: bool,
    pub sha: String,
    pub created_at: DateTime<Utc>,
}

/// GitLab pipeline job from API (GET /projects/:id/pipelines/:pipeline_id/jobs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabJob {
    pub id: i64,
    pub name: String,
    pub stage: String,
    pub status: String,
    pub coverage: Option<f64>,
}

impl GitLabPipeline {
    /// Combine the pipeline with its jobs into the aggregation read model.
    ///
    /// The API lists jobs newest first; they are put back into creation
    /// order (ascending ID).
    pub fn into_pipeline(self, mut jobs: Vec<GitLabJob>) -> Pipeline {
        jobs.sort_by_key(|job| job.id);

        Pipeline {
            id: self.id,
            project_id: self.project_id,
            ref_name: self.ref_name,
            tag: self.tag,
            created_at: self.created_at,
            jobs: jobs
                .into_iter()
                .map(|job| Job {
                    id: job.id,
                    name: job.name,
                    coverage: job.coverage,
                })
                .collect(),
        }
    }
}

impl GitLabClient {
    /// Create a new GitLab client.
    pub fn new(config: GitLabClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        if !config.token.is_empty() {
            let token_value = header::HeaderValue::from_str(&config.token)
                .map_err(|_| AppError::authentication("Invalid token format"))?;
            headers.insert("PRIVATE-TOKEN", token_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Get the full URL for an API v4 endpoint.
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url(), path)
    }

    /// Resolve a web URL: absolute URLs pass through, anything else is
    /// joined onto the instance base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url(), url.trim_start_matches('/'))
        }
    }

    /// Parse pagination headers from response.
    fn parse_pagination(response: &Response) -> PaginationInfo {
        let headers = response.headers();

        let get_header = |name: &str| -> Option<u32> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
        };

        PaginationInfo {
            page: get_header("x-page").unwrap_or(1),
            total_pages: get_header("x-total-pages").unwrap_or(1),
            next_page: get_header("x-next-page"),
        }
    }

    /// Turn a non-success response into an `AppError`.
    async fn error_from_response(response: Response, endpoint: &str) -> AppError {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return AppError::authentication("GitLab token expired or revoked");
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        // GitLab returns errors as {"message": "..."} or {"error": "..."}
        let body_message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message").or_else(|| v.get("error")).map(|m| match m.as_str() {
                    Some(s) => s.to_string(),
                    // e.g. {"message": {"base": ["msg"]}}
                    None => m.to_string(),
                })
            });

        let message = match (status, &body_message) {
            (StatusCode::FORBIDDEN, _) => "Access denied".to_string(),
            (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
            (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
            (_, Some(msg)) => msg.clone(),
            _ => format!("Request failed ({}): {}", status_code, body),
        };

        AppError::gitlab_api_full(message, status_code, endpoint)
    }

    /// Handle API response errors and decode the body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else {
            Err(Self::error_from_response(response, endpoint).await)
        }
    }

    /// Fetch all pages of a paginated endpoint.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>, AppError> {
        let mut all_data = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.api_url(endpoint);
            let response = self
                .client
                .get(&url)
                .query(&[("page", page.to_string()), ("per_page", "100".to_string())])
                .send()
                .await?;

            let pagination = Self::parse_pagination(&response);
            let data = self.handle_response::<Vec<T>>(response, endpoint).await?;
            log::debug!(
                "[gitlab] {} page {}/{}: {} item(s)",
                endpoint,
                pagination.page,
                pagination.total_pages,
                data.len()
            );
            all_data.extend(data);

            match pagination.following_page() {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(all_data)
    }

    /// Get a single pipeline.
    pub async fn get_pipeline(
        &self,
        project_id: i64,
        pipeline_id: i64,
    ) -> Result<GitLabPipeline, AppError> {
        let endpoint = format!("/projects/{}/pipelines/{}", project_id, pipeline_id);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// Get all jobs of a pipeline.
    pub async fn get_pipeline_jobs(
        &self,
        project_id: i64,
        pipeline_id: i64,
    ) -> Result<Vec<GitLabJob>, AppError> {
        let endpoint = format!("/projects/{}/pipelines/{}/jobs", project_id, pipeline_id);
        self.get_all_pages(&endpoint).await
    }

    /// Fetch a pipeline together with its jobs.
    pub async fn fetch_pipeline_with_jobs(
        &self,
        project_id: i64,
        pipeline_id: i64,
    ) -> Result<Pipeline, AppError> {
        let pipeline = self.get_pipeline(project_id, pipeline_id).await?;
        let jobs = self.get_pipeline_jobs(project_id, pipeline_id).await?;
        Ok(pipeline.into_pipeline(jobs))
    }

    /// Send a JSON PATCH, expecting only a success status.
    ///
    /// `url` may be absolute or relative to the instance base URL.
    pub async fn patch_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(), AppError> {
        let full_url = self.resolve_url(url);
        log::debug!("[gitlab] PATCH {}", full_url);

        let response = self.client.patch(&full_url).json(body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, url).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client(base_url: &str) -> GitLabClient {
        GitLabClient::new(GitLabClientConfig {
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
            timeout_secs: 30,
        })
        .unwrap()
    }

    #[test]
    fn test_api_url_construction() {
        let client = client("https://gitlab.com/");
        assert_eq!(client.api_url("/user"), "https://gitlab.com/api/v4/user");
    }

    #[test]
    fn test_resolve_url() {
        let client = client("https://gitlab.example.com/");
        assert_eq!(
            client.resolve_url("/group/project/-/issues/7.json"),
            "https://gitlab.example.com/group/project/-/issues/7.json"
        );
        assert_eq!(
            client.resolve_url("group/project/-/issues/7.json"),
            "https://gitlab.example.com/group/project/-/issues/7.json"
        );
        assert_eq!(
            client.resolve_url("http://other.host/x"),
            "http://other.host/x"
        );
    }

    #[test]
    fn test_following_page() {
        let info = |page, total_pages, next_page| PaginationInfo {
            page,
            total_pages,
            next_page,
        };

        assert_eq!(info(1, 3, Some(2)).following_page(), Some(2));
        assert_eq!(info(2, 3, None).following_page(), Some(3));
        assert_eq!(info(3, 3, None).following_page(), None);
        // Defaults when the instance sends no pagination headers at all.
        assert_eq!(info(1, 1, None).following_page(), None);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let result = GitLabClient::new(GitLabClientConfig {
            base_url: "https://gitlab.com".to_string(),
            token: "bad\ntoken".to_string(),
            timeout_secs: 30,
        });
        assert!(matches!(result, Err(AppError::Authentication { .. })));
    }

    #[test]
    fn test_pipeline_deserialization_and_conversion() {
        let pipeline: GitLabPipeline = serde_json::from_str(
            r#"{
                "id": 46,
                "project_id": 1,
                "status": "success",
                "ref": "v1.0.0",
                "tag": true,
                "sha": "a91957a858320c0e17f3a0eca7cfacbff50ea29a",
                "created_at": "2020-02-06T00:01:10.000Z"
            }"#,
        )
        .unwrap();

        let jobs: Vec<GitLabJob> = serde_json::from_str(
            r#"[
                {"id": 8, "name": "2/2 karma", "stage": "test", "status": "success", "coverage": 90.0},
                {"id": 7, "name": "3/3 rspec", "stage": "test", "status": "success", "coverage": 80},
                {"id": 9, "name": "extra", "stage": "deploy", "status": "success", "coverage": null}
            ]"#,
        )
        .unwrap();

        let pipeline = pipeline.into_pipeline(jobs);

        assert_eq!(pipeline.source_ref_path(), "refs/tags/v1.0.0");
        assert_eq!(
            pipeline.created_at,
            Utc.with_ymd_and_hms(2020, 2, 6, 0, 1, 10).unwrap()
        );
        let ids: Vec<i64> = pipeline.jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![7, 8, 9]);
        assert_eq!(pipeline.jobs[0].coverage, Some(80.0));
        assert_eq!(pipeline.jobs[2].coverage, None);
    }
}
