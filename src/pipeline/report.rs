//! Severity-tagged status reporting
//!
//! Every user-visible failure or status change in a pipeline flows through
//! one [`Reporter`]: stages and edges report, the embedding host reads. The
//! latest report mirrors the status box of the original playground (each
//! message overwrites the last); the history is kept for inspection and
//! tests. Reports also feed the `tracing` subscriber at a matching level.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Severity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Informational status
    Status,
    /// Degraded but usable (e.g. an unavailable compiler edge)
    Warning,
    /// Failure requiring user attention
    Error,
}

/// One reported message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Severity tag
    pub severity: Severity,
    /// Originating component (stage title, edge key, or `"pipeline"`)
    pub origin: String,
    /// Message text
    pub message: String,
    /// Report time
    pub at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    latest: RwLock<Option<Report>>,
    history: RwLock<Vec<Report>>,
}

/// Shared reporting channel, one per pipeline. Cheap to clone.
#[derive(Clone, Default)]
pub struct Reporter {
    inner: Arc<Inner>,
}

impl Reporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an informational status.
    pub fn status(&self, origin: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Status, origin.into(), message.into());
    }

    /// Report a non-fatal degradation.
    pub fn warning(&self, origin: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, origin.into(), message.into());
    }

    /// Report a failure.
    pub fn error(&self, origin: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, origin.into(), message.into());
    }

    /// Clear the latest report (history is retained).
    pub fn clear(&self) {
        *self.inner.latest.write() = None;
    }

    /// The most recent report, if one is showing.
    pub fn latest(&self) -> Option<Report> {
        self.inner.latest.read().clone()
    }

    /// All reports in order.
    pub fn history(&self) -> Vec<Report> {
        self.inner.history.read().clone()
    }

    fn push(&self, severity: Severity, origin: String, message: String) {
        match severity {
            Severity::Status => tracing::info!(%origin, %message, "report"),
            Severity::Warning => tracing::warn!(%origin, %message, "report"),
            Severity::Error => tracing::error!(%origin, %message, "report"),
        }
        let report = Report {
            severity,
            origin,
            message,
            at: Utc::now(),
        };
        *self.inner.latest.write() = Some(report.clone());
        self.inner.history.write().push(report);
    }
}
