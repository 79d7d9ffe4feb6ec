//! GitHub REST API client.
//!
//! Typed HTTP client for the endpoints the enrichment layer consumes,
//! with bearer-token authentication and page walking.

use crate::error::AppError;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// Base URL of the API (e.g., `https://api.github.com`).
    pub base_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

/// Query parameters for listing pull requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullRequestsQuery {
    /// Filter by state: `open`, `closed`, `all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Filter by base branch name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Sort field: `created`, `updated`, `popularity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Page number for pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Number of items per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// GitHub user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

/// GitHub team from API (requested-reviewers endpoint).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubTeam {
    pub slug: String,
}

/// Branch reference nested in a pull request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubBranchRef {
    pub sha: String,
}

/// GitHub pull request from API.
///
/// `requested_reviewers` embedded here is the primary requested-reviewer
/// source; the dedicated endpoint is the secondary one.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPullRequest {
    pub number: i64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub user: GitHubUser,
    pub head: GitHubBranchRef,
    pub requested_reviewers: Option<Vec<GitHubUser>>,
    pub mergeable_state: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// GitHub review submission from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReview {
    pub id: i64,
    pub user: Option<GitHubUser>,
    pub state: String,
    pub body: Option<String>,
    pub submitted_at: Option<String>,
}

/// GitHub inline review comment from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReviewComment {
    pub id: i64,
    pub user: GitHubUser,
    pub body: String,
    pub path: String,
    pub line: Option<i64>,
    pub original_line: Option<i64>,
    pub side: Option<String>,
    pub in_reply_to_id: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// GitHub general (issue) comment from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssueComment {
    pub id: i64,
    pub user: GitHubUser,
    pub body: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Payload of the dedicated requested-reviewers endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubRequestedReviewers {
    #[serde(default)]
    pub users: Vec<GitHubUser>,
    #[serde(default)]
    pub teams: Vec<GitHubTeam>,
}

/// Combined commit status for the head commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCombinedStatus {
    pub state: String,
    pub total_count: i64,
    #[serde(default)]
    pub statuses: Vec<GitHubCommitStatus>,
}

/// One sub-status inside a combined status payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitStatus {
    pub state: String,
    pub context: String,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        let token_value = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| AppError::authentication("Invalid token format"))?;
        headers.insert(header::AUTHORIZATION, token_value);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("pr-pulse"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL for API requests.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Handle API response errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::authentication(
                "Token rejected by the platform. Please re-authenticate.",
            ));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::rate_limited("Rate limit exceeded"));
        }

        // 403 with an exhausted quota header is the platform's throttle signal
        if status == StatusCode::FORBIDDEN {
            let remaining = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok());
            if remaining == Some("0") {
                return Err(AppError::rate_limited("Rate limit exceeded"));
            }
        }

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::not_found_with_id("endpoint", endpoint));
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(String::from))
            .unwrap_or_else(|| format!("Request failed ({}): {}", status_code, body));

        Err(AppError::api_full(message, status_code, endpoint))
    }

    /// Fetch all pages of a paginated endpoint.
    ///
    /// GitHub signals the last page via Link headers; walking pages until a
    /// short page arrives avoids header parsing and costs at most one extra
    /// request per collection.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>, AppError> {
        const PER_PAGE: usize = 100;

        let mut all_data = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.api_url(endpoint);
            let response = self
                .client
                .get(&url)
                .query(&[("page", page.to_string()), ("per_page", PER_PAGE.to_string())])
                .send()
                .await?;

            let data: Vec<T> = self.handle_response(response, endpoint).await?;
            let page_len = data.len();
            all_data.extend(data);

            if page_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all_data)
    }

    /// Validate the token by fetching the current user.
    ///
    /// Also the source of the viewer identity used for viewer-first ordering.
    pub async fn validate_token(&self) -> Result<GitHubUser, AppError> {
        let url = self.api_url("/user");
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, "/user").await
    }

    /// List pull requests for a repository.
    pub async fn list_pull_requests(
        &self,
        repo: &str,
        query: &PullRequestsQuery,
    ) -> Result<Vec<GitHubPullRequest>, AppError> {
        let endpoint = format!("/repos/{}/pulls", repo);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).query(query).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// Get a single pull request descriptor.
    ///
    /// This is the one mandatory collection: its absence is fatal for the
    /// PR's enrichment.
    pub async fn get_pull_request(
        &self,
        repo: &str,
        number: i64,
    ) -> Result<GitHubPullRequest, AppError> {
        let endpoint = format!("/repos/{}/pulls/{}", repo, number);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// List review submissions on a pull request.
    pub async fn list_reviews(
        &self,
        repo: &str,
        number: i64,
    ) -> Result<Vec<GitHubReview>, AppError> {
        self.get_all_pages(&format!("/repos/{}/pulls/{}/reviews", repo, number))
            .await
    }

    /// List inline review comments on a pull request.
    pub async fn list_review_comments(
        &self,
        repo: &str,
        number: i64,
    ) -> Result<Vec<GitHubReviewComment>, AppError> {
        self.get_all_pages(&format!("/repos/{}/pulls/{}/comments", repo, number))
            .await
    }

    /// List general discussion comments on a pull request.
    pub async fn list_issue_comments(
        &self,
        repo: &str,
        number: i64,
    ) -> Result<Vec<GitHubIssueComment>, AppError> {
        self.get_all_pages(&format!("/repos/{}/issues/{}/comments", repo, number))
            .await
    }

    /// Get the dedicated requested-reviewers list for a pull request.
    pub async fn get_requested_reviewers(
        &self,
        repo: &str,
        number: i64,
    ) -> Result<GitHubRequestedReviewers, AppError> {
        let endpoint = format!("/repos/{}/pulls/{}/requested_reviewers", repo, number);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// Get the combined commit status for a ref.
    pub async fn get_combined_status(
        &self,
        repo: &str,
        git_ref: &str,
    ) -> Result<GitHubCombinedStatus, AppError> {
        let endpoint = format!("/repos/{}/commits/{}/status", repo, git_ref);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, &endpoint).await
    }
}
