//! Run report delivery
//!
//! Notification is best effort: callers turn a failed delivery into a
//! warning and never fail the run because of it.

use crate::boundary::BoundaryWarning;
use crate::config::NotifyConfig;
use crate::error::{ReleaseError, Result};
use crate::report::RunReport;
use reqwest::blocking::Client;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

pub trait NotificationSink: Send + Sync {
    fn deliver(&self, report: &RunReport) -> Result<()>;
}

/// POSTs the JSON run report to a webhook
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(config: &NotifyConfig, url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("git-release/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(WebhookSink {
            client,
            url: url.into(),
        })
    }
}

impl NotificationSink for WebhookSink {
    fn deliver(&self, report: &RunReport) -> Result<()> {
        let response = self.client.post(&self.url).json(report).send()?;
        if !response.status().is_success() {
            return Err(ReleaseError::Notify(format!(
                "webhook answered {}",
                response.status()
            )));
        }
        info!("run report delivered to webhook");
        Ok(())
    }
}

/// Writes the run report to the log; used when no webhook is configured
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, report: &RunReport) -> Result<()> {
        let json = serde_json::to_string(report)
            .map_err(|e| ReleaseError::Notify(format!("cannot encode run report: {}", e)))?;
        info!(report = %json, "run report");
        Ok(())
    }
}

/// Keeps delivered reports in memory, for tests
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<RunReport>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries always fail
    pub fn failing() -> Self {
        RecordingSink {
            reports: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn reports(&self) -> Vec<RunReport> {
        match self.reports.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, report: &RunReport) -> Result<()> {
        match self.reports.lock() {
            Ok(mut guard) => guard.push(report.clone()),
            Err(poisoned) => poisoned.into_inner().push(report.clone()),
        }
        if self.fail {
            return Err(ReleaseError::Notify("sink unreachable".to_string()));
        }
        Ok(())
    }
}

/// Webhook sink when a URL is configured, log sink otherwise
///
/// A webhook client that cannot be built degrades to the log sink with a
/// warning instead of aborting the run.
pub fn sink_for(
    config: &NotifyConfig,
    webhook_url: Option<&str>,
) -> (Box<dyn NotificationSink>, Option<BoundaryWarning>) {
    let Some(url) = webhook_url else {
        return (Box::new(LogSink), None);
    };
    match WebhookSink::new(config, url) {
        Ok(sink) => (Box::new(sink), None),
        Err(e) => {
            let warning = BoundaryWarning::NotificationFailed {
                reason: e.to_string(),
            };
            warning.emit();
            (Box::new(LogSink), Some(warning))
        }
    }
}

/// Deliver a report, converting failure into a warning
pub fn notify(sink: &dyn NotificationSink, report: &RunReport) -> Option<BoundaryWarning> {
    match sink.deliver(report) {
        Ok(()) => None,
        Err(e) => {
            let warning = BoundaryWarning::NotificationFailed {
                reason: e.to_string(),
            };
            warning.emit();
            Some(warning)
        }
    }
}
