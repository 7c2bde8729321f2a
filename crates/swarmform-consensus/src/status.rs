//! Periodic status heartbeat
//!
//! While a run is active the runner posts a `running` status to an HTTP
//! endpoint every interval, and a final `offline` status on shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use swarmform_common::{FormationError, Result};

use crate::descriptor::AlgorithmDescriptor;

/// Per-request timeout for status posts
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state announced to the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Offline,
}

/// One heartbeat entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub version: String,
    pub creator: String,
    pub description: String,
    pub run_id: Uuid,
    pub status: RunStatus,
    pub last_update: DateTime<Utc>,
}

/// Posts status messages for one algorithm run
#[derive(Debug, Clone)]
pub struct StatusReporter {
    client: reqwest::Client,
    url: String,
    descriptor: AlgorithmDescriptor,
    run_id: Uuid,
}

impl StatusReporter {
    pub fn new(
        url: impl Into<String>,
        descriptor: AlgorithmDescriptor,
        run_id: Uuid,
    ) -> Result<Self> {
        // Status endpoints sit on the local network; bypass system proxies
        let client = reqwest::Client::builder()
            .timeout(STATUS_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| FormationError::Config(format!("status client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            descriptor,
            run_id,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn message(&self, status: RunStatus) -> StatusMessage {
        let d = &self.descriptor;
        StatusMessage {
            name: d.name.clone(),
            category: d.category.clone(),
            subcategory: d.subcategory.clone(),
            version: d.version.clone(),
            creator: d.creator.clone(),
            description: d.description.clone(),
            run_id: self.run_id,
            status,
            last_update: Utc::now(),
        }
    }

    /// Post a single status; the body is a one-element JSON array
    pub async fn send(&self, status: RunStatus) -> Result<()> {
        let body = [self.message(status)];
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| FormationError::Io(format!("status post failed: {e}")))?;

        let code = response.status();
        if !code.is_success() {
            return Err(FormationError::Io(format!(
                "status endpoint returned HTTP {}",
                code.as_u16()
            )));
        }

        debug!(url = %self.url, ?status, "Status reported");
        Ok(())
    }

    /// Post `running` every `interval` until the heartbeat is shut down
    pub fn start(self, interval: Duration) -> Heartbeat {
        let reporter = Arc::new(self);
        let (stop, mut stopped) = oneshot::channel::<()>();
        let task_reporter = Arc::clone(&reporter);
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        if let Err(e) = task_reporter.send(RunStatus::Running).await {
                            warn!(error = %e, "Status heartbeat failed");
                        }
                    }
                }
            }
        });

        info!(
            url = %reporter.url,
            interval_secs = period.as_secs_f64(),
            "Status heartbeat started"
        );
        Heartbeat {
            reporter,
            stop,
            handle,
        }
    }
}

/// Handle to a running heartbeat task
#[derive(Debug)]
pub struct Heartbeat {
    reporter: Arc<StatusReporter>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Stop the periodic task, then announce `offline`
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Status heartbeat task ended abnormally");
        }
        self.reporter.send(RunStatus::Offline).await?;
        info!("Status heartbeat stopped");
        Ok(())
    }
}
