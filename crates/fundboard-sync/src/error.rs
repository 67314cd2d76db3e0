//! Error taxonomy for the synchronization layer.
//!
//! Nothing here is fatal: every variant is recovered from locally, either by
//! the user retrying or by the next scheduled tick.

use std::time::Duration;

use fundboard_proto::protocol::{FailureKind, LoadFailure};
use fundboard_proto::report::{AssetKind, UnknownAsset};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// Transport failure or non-success status from a backend service.
    #[error("network error: {0}")]
    Network(String),

    /// A request exceeded its bound.  Handled exactly like `Network`.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The backend has no content for this report.
    #[error("report not found: {0}")]
    NotFound(String),

    /// Out-of-domain input, e.g. an unknown asset kind.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A generation job is already running; the lock is global.
    #[error("a {0} report is already being generated")]
    Busy(AssetKind),

    #[error("dashboard core is not running")]
    CoreStopped,
}

impl DashboardError {
    /// Network-equivalent failures share one recovery path.
    pub fn is_network(&self) -> bool {
        matches!(self, DashboardError::Network(_) | DashboardError::Timeout(_))
    }

    pub fn failure(&self) -> LoadFailure {
        let kind = match self {
            DashboardError::NotFound(_) => FailureKind::NotFound,
            DashboardError::Validation(_) => FailureKind::Validation,
            _ => FailureKind::Network,
        };
        LoadFailure {
            kind,
            message: self.to_string(),
        }
    }
}

impl From<UnknownAsset> for DashboardError {
    fn from(e: UnknownAsset) -> Self {
        DashboardError::Validation(e.to_string())
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        DashboardError::Network(e.to_string())
    }
}

/// Why an async completion was dropped instead of applied.  Not an error;
/// broadcast and logged so superseded work stays observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    /// An older listing finished after a newer one was applied.
    StaleCatalog { seq: u64, applied: u64 },
    /// Content for a selection that has since been replaced.
    StaleContent { filename: String, seq: u64, latest: u64 },
    /// Overview result from a poller that is no longer active.
    InactivePoller { epoch: u64 },
    /// Settle for a generation job the core does not know about.
    UnknownJob { id: u64 },
}

impl std::fmt::Display for Discard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discard::StaleCatalog { seq, applied } => {
                write!(f, "stale catalog listing #{} (applied #{})", seq, applied)
            }
            Discard::StaleContent {
                filename,
                seq,
                latest,
            } => write!(
                f,
                "stale content for {} (request #{}, latest #{})",
                filename, seq, latest
            ),
            Discard::InactivePoller { epoch } => {
                write!(f, "overview from inactive poller epoch {}", epoch)
            }
            Discard::UnknownJob { id } => write!(f, "settle for unknown generation job {}", id),
        }
    }
}
