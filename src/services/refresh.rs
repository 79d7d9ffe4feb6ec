//! Background refresh loop.
//!
//! Periodically re-fetches the watched repositories, re-runs enrichment,
//! seeds the notification ledger for newly observed subjects, and runs the
//! opportunistic ledger sweep. The loop owns the engine; callers hold a
//! lightweight handle and communicate over an mpsc channel.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::PullRequestDetail;
use crate::services::enrichment;
use crate::services::github_client::{GitHubClient, PullRequestsQuery};
use crate::services::notifications;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::time;

/// Default refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 120;

/// Refresh engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Refresh interval in seconds.
    pub interval_secs: u64,

    /// Repositories to watch, in `owner/repo` form.
    pub repos: Vec<String>,

    /// Maximum number of PRs to enrich per repository per cycle.
    pub max_prs_per_cycle: usize,

    /// Maximum number of PRs enriched concurrently.
    pub enrich_concurrency: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            repos: Vec::new(),
            max_prs_per_cycle: 50,
            enrich_concurrency: 8,
        }
    }
}

/// Status of the refresh engine.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    /// Whether a refresh cycle is currently running.
    pub is_refreshing: bool,

    /// Last successful refresh timestamp (epoch ms).
    pub last_refresh_time: Option<i64>,

    /// Last refresh error message.
    pub last_error: Option<String>,

    /// Number of PRs aggregated in the last cycle.
    pub last_pr_count: i64,
}

/// Result of one refresh cycle.
#[derive(Debug)]
pub struct RefreshResult {
    /// Number of PRs aggregated.
    pub pr_count: i64,

    /// PRs emitted with only base fields because enrichment failed.
    pub unavailable_count: i64,

    /// Newly seeded ledger entries.
    pub seeded_entries: usize,

    /// Ledger entries removed by the idle sweep.
    pub swept_entries: u64,

    /// Per-PR and per-repo errors encountered. Never aborts the cycle.
    pub errors: Vec<String>,

    /// Duration of the cycle in milliseconds.
    pub duration_ms: i64,
}

/// Commands that can be sent to the refresh engine.
#[derive(Debug)]
pub enum RefreshCommand {
    /// Trigger an immediate refresh.
    TriggerRefresh,

    /// Update the refresh configuration.
    UpdateConfig(RefreshConfig),

    /// Stop the refresh engine.
    Stop,
}

/// Lightweight handle for controlling the background refresh engine.
///
/// Communicates with the background loop via an mpsc channel, avoiding lock
/// contention on the engine itself.
#[derive(Clone)]
pub struct RefreshHandle {
    command_tx: mpsc::Sender<RefreshCommand>,
    config: Arc<RwLock<RefreshConfig>>,
    snapshot: Arc<RwLock<Vec<PullRequestDetail>>>,
}

impl RefreshHandle {
    /// Trigger an immediate refresh.
    pub async fn trigger_refresh(&self) -> Result<(), AppError> {
        self.command_tx
            .send(RefreshCommand::TriggerRefresh)
            .await
            .map_err(|_| AppError::internal("Refresh engine not running"))
    }

    /// Update the refresh configuration.
    pub async fn update_config(&self, config: RefreshConfig) -> Result<(), AppError> {
        self.command_tx
            .send(RefreshCommand::UpdateConfig(config))
            .await
            .map_err(|_| AppError::internal("Refresh engine not running"))
    }

    /// Stop the background loop. In-flight work is abandoned, not unwound.
    pub async fn stop(&self) -> Result<(), AppError> {
        self.command_tx
            .send(RefreshCommand::Stop)
            .await
            .map_err(|_| AppError::internal("Refresh engine not running"))
    }

    /// Get the current configuration.
    pub async fn get_config(&self) -> RefreshConfig {
        self.config.read().await.clone()
    }

    /// Latest aggregated snapshot from the most recent completed cycle.
    pub async fn latest_snapshot(&self) -> Vec<PullRequestDetail> {
        self.snapshot.read().await.clone()
    }
}

/// Background refresh engine.
pub struct RefreshEngine {
    pool: DbPool,
    client: GitHubClient,

    /// Viewer login for viewer-first ordering. Resolved from the token when
    /// not supplied.
    viewer: Option<String>,

    config: Arc<RwLock<RefreshConfig>>,
    status: Arc<RwLock<RefreshStatus>>,
    snapshot: Arc<RwLock<Vec<PullRequestDetail>>>,
}

impl RefreshEngine {
    /// Create a new refresh engine.
    pub fn new(pool: DbPool, client: GitHubClient, viewer: Option<String>) -> Self {
        Self {
            pool,
            client,
            viewer,
            config: Arc::new(RwLock::new(RefreshConfig::default())),
            status: Arc::new(RwLock::new(RefreshStatus::default())),
            snapshot: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start the background refresh loop.
    ///
    /// Spawns a task that owns the engine and refreshes at the configured
    /// interval. Returns a `RefreshHandle` for sending commands and reading
    /// the latest snapshot.
    pub fn start_background(
        pool: DbPool,
        client: GitHubClient,
        viewer: Option<String>,
        config: RefreshConfig,
    ) -> RefreshHandle {
        let (tx, mut rx) = mpsc::channel::<RefreshCommand>(16);
        let config_shared = Arc::new(RwLock::new(config.clone()));
        let snapshot_shared = Arc::new(RwLock::new(Vec::new()));

        let engine = RefreshEngine {
            pool,
            client,
            viewer,
            config: config_shared.clone(),
            status: Arc::new(RwLock::new(RefreshStatus::default())),
            snapshot: snapshot_shared.clone(),
        };

        tokio::spawn(async move {
            eprintln!("[refresh] Running initial refresh...");
            match engine.run_refresh().await {
                Ok(r) => eprintln!(
                    "[refresh] Initial refresh complete: {} PRs, {} unavailable, {} errors",
                    r.pr_count,
                    r.unavailable_count,
                    r.errors.len()
                ),
                Err(e) => eprintln!("[refresh] Initial refresh error: {}", e),
            }

            let interval_secs = { engine.config.read().await.interval_secs };
            let mut interval = time::interval(Duration::from_secs(interval_secs));
            // Consume the first (immediate) tick since we just refreshed
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = engine.run_refresh().await {
                            eprintln!("[refresh] Periodic refresh error: {}", e);
                        }
                    }
                    Some(cmd) = rx.recv() => {
                        match cmd {
                            RefreshCommand::TriggerRefresh => {
                                eprintln!("[refresh] Manual refresh triggered");
                                if let Err(e) = engine.run_refresh().await {
                                    eprintln!("[refresh] Manual refresh error: {}", e);
                                }
                            }
                            RefreshCommand::UpdateConfig(new_config) => {
                                eprintln!(
                                    "[refresh] Config updated, interval={}s",
                                    new_config.interval_secs
                                );
                                interval =
                                    time::interval(Duration::from_secs(new_config.interval_secs));
                                *engine.config.write().await = new_config;
                            }
                            RefreshCommand::Stop => {
                                eprintln!("[refresh] Refresh engine stopping");
                                break;
                            }
                        }
                    }
                }
            }
            eprintln!("[refresh] Refresh engine stopped");
        });

        RefreshHandle {
            command_tx: tx,
            config: config_shared,
            snapshot: snapshot_shared,
        }
    }

    /// Run a single refresh cycle.
    ///
    /// Lists open PRs for each watched repository, enriches them with
    /// bounded concurrency, seeds ledger entries for newly observed
    /// subjects, and runs the opportunistic sweep. Per-repo and per-PR
    /// failures are collected, never propagated.
    pub async fn run_refresh(&self) -> Result<RefreshResult, AppError> {
        let start = Instant::now();
        let now_ms = notifications::now_ms();

        {
            let mut status = self.status.write().await;
            status.is_refreshing = true;
        }

        let config = self.config.read().await.clone();
        let viewer = match &self.viewer {
            Some(viewer) => Some(viewer.clone()),
            None => self.client.validate_token().await.ok().map(|u| u.login),
        };

        let mut result = RefreshResult {
            pr_count: 0,
            unavailable_count: 0,
            seeded_entries: 0,
            swept_entries: 0,
            errors: Vec::new(),
            duration_ms: 0,
        };

        let mut all_details = Vec::new();

        for repo in &config.repos {
            let query = PullRequestsQuery {
                state: Some("open".to_string()),
                per_page: Some(100),
                ..Default::default()
            };

            let mut listing = match self.client.list_pull_requests(repo, &query).await {
                Ok(listing) => listing,
                Err(e) => {
                    result.errors.push(format!("{}: {}", repo, e));
                    continue;
                }
            };
            if listing.len() > config.max_prs_per_cycle {
                listing.truncate(config.max_prs_per_cycle);
            }

            let details = enrichment::enrich_pull_requests(
                &self.client,
                repo,
                listing,
                viewer.as_deref(),
                config.enrich_concurrency,
            )
            .await;

            for detail in &details {
                let subject = detail.pull_request.subject_key();
                if detail.reviewers_unavailable {
                    result.unavailable_count += 1;
                    result.errors.push(format!("{}: reviewers unavailable", subject));
                }

                let reviewers: Vec<String> = detail
                    .reviewer_states
                    .iter()
                    .map(|s| s.reviewer_id.clone())
                    .collect();
                match notifications::observe_subject(&self.pool, &subject, &reviewers, now_ms)
                    .await
                {
                    Ok(seeded) => result.seeded_entries += seeded,
                    Err(e) => result.errors.push(format!("{}: {}", subject, e)),
                }
            }

            result.pr_count += details.len() as i64;
            all_details.extend(details);
        }

        // Opportunistic ledger sweep; best-effort
        match notifications::sweep_idle_entries(&self.pool, now_ms).await {
            Ok(swept) => result.swept_entries = swept,
            Err(e) => result.errors.push(format!("ledger sweep: {}", e)),
        }

        result.duration_ms = start.elapsed().as_millis() as i64;

        *self.snapshot.write().await = all_details;

        {
            let mut status = self.status.write().await;
            status.is_refreshing = false;
            status.last_refresh_time = Some(now_ms);
            status.last_pr_count = result.pr_count;
            status.last_error = if result.errors.is_empty() {
                None
            } else {
                Some(result.errors.join("; "))
            };
        }

        eprintln!(
            "[refresh] Cycle complete: {} PRs, {} seeded, {} swept, {} errors ({}ms)",
            result.pr_count,
            result.seeded_entries,
            result.swept_entries,
            result.errors.len(),
            result.duration_ms
        );

        Ok(result)
    }

    /// Get the current engine status.
    pub async fn get_status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }
}
