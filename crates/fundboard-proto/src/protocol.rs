use serde::{Deserialize, Serialize};

use crate::overview::OverviewSnapshot;
use crate::report::{AssetKind, ReportSummary};

/// Operations accepted by the dashboard core.  Serialized with a `cmd` tag
/// for the local JSON API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Refresh,
    Select { report: ReportSummary },
    SelectFilename { filename: String },
    Generate { asset: AssetKind },
    SetQuery { query: String },
    ToggleDate { date: String },
    StartPolling,
    StopPolling,
    RefreshOverview,
    DismissNotice { id: u64 },
}

/// Everything the presentation layer may read.  `rev` is a monotonically
/// increasing counter bumped on every published change, so readers can tell
/// whether anything moved since their last look.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    #[serde(default)]
    pub rev: u64,
    pub catalog: CatalogState,
    /// Current search string for the grouped view.
    pub query: String,
    pub selection: SelectionState,
    pub generation: GenerationState,
    pub overview: OverviewState,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    pub reports: Vec<ReportSummary>,
    /// Date groups currently expanded in the browser, newest first.
    pub expanded_dates: Vec<String>,
    /// At least one listing request is outstanding.
    pub refreshing: bool,
    pub last_error: Option<LoadFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    pub current: Option<ReportSummary>,
    /// Markdown body of the last successfully loaded report.
    pub content: String,
    pub loading: bool,
    /// Set when the latest content fetch failed; cleared by the next select.
    pub error: Option<LoadFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed,
}

impl SelectionState {
    pub fn status(&self) -> LoadStatus {
        if self.loading {
            LoadStatus::Loading
        } else if self.error.is_some() {
            LoadStatus::Failed
        } else if self.current.is_some() {
            LoadStatus::Loaded
        } else {
            LoadStatus::Idle
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationState {
    /// Single lock shared by every asset kind.
    pub busy: bool,
    pub running: Option<AssetKind>,
    pub last_outcome: Option<GenerationOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub asset: AssetKind,
    pub succeeded: bool,
    pub message: String,
    pub finished_at: chrono::DateTime<chrono::Local>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewState {
    /// The poller is running.
    pub active: bool,
    /// Waiting for the first snapshot (or a manual refresh).
    pub loading: bool,
    pub snapshot: Option<OverviewSnapshot>,
    pub last_error: Option<LoadFailure>,
    pub fetched_at: Option<chrono::DateTime<chrono::Local>>,
}

/// A failed load as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    NotFound,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible notice.  Errors stay until dismissed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub raised_at: chrono::DateTime<chrono::Local>,
}
