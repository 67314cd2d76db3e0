use std::sync::Arc;

use fundboard_proto::protocol::{Command, DashboardState};
use fundboard_proto::report::{AssetKind, ReportSummary};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::core::{CoreBroadcast, CoreEvent};
use crate::error::DashboardError;
use crate::index::{self, GroupedView};
use crate::state::StateManager;

/// Cloneable front door to a running `DashboardCore`.
///
/// Each operation returns once the core has applied it and published the
/// resulting state, so a `state()` read right after sees the change.  The
/// network work an operation starts (fetching a listing, loading content,
/// running a generation job) completes later and is observed through
/// `subscribe()` or subsequent `state()` reads.
#[derive(Clone)]
pub struct DashboardHandle {
    event_tx: mpsc::Sender<CoreEvent>,
    state_manager: Arc<StateManager>,
    broadcast_tx: broadcast::Sender<CoreBroadcast>,
}

impl DashboardHandle {
    pub(crate) fn new(
        event_tx: mpsc::Sender<CoreEvent>,
        state_manager: Arc<StateManager>,
        broadcast_tx: broadcast::Sender<CoreBroadcast>,
    ) -> Self {
        Self {
            event_tx,
            state_manager,
            broadcast_tx,
        }
    }

    pub async fn dispatch(&self, cmd: Command) -> Result<(), DashboardError> {
        let (reply, rx) = oneshot::channel();
        self.event_tx
            .send(CoreEvent::Command {
                cmd,
                reply: Some(reply),
            })
            .await
            .map_err(|_| DashboardError::CoreStopped)?;
        rx.await.map_err(|_| DashboardError::CoreStopped)?
    }

    pub async fn refresh(&self) -> Result<(), DashboardError> {
        self.dispatch(Command::Refresh).await
    }

    pub async fn select(&self, report: ReportSummary) -> Result<(), DashboardError> {
        self.dispatch(Command::Select { report }).await
    }

    /// Select a report from the current catalog by filename.
    pub async fn select_filename(&self, filename: &str) -> Result<(), DashboardError> {
        self.dispatch(Command::SelectFilename {
            filename: filename.to_string(),
        })
        .await
    }

    /// Start a generation job.  Fails with `Busy` while any job runs.
    pub async fn generate(&self, asset: AssetKind) -> Result<(), DashboardError> {
        self.dispatch(Command::Generate { asset }).await
    }

    /// Like `generate`, for an asset name coming from outside ("gold").
    pub async fn generate_named(&self, asset: &str) -> Result<(), DashboardError> {
        let asset: AssetKind = asset.parse()?;
        self.generate(asset).await
    }

    pub async fn set_query(&self, query: &str) -> Result<(), DashboardError> {
        self.dispatch(Command::SetQuery {
            query: query.to_string(),
        })
        .await
    }

    pub async fn toggle_date(&self, date: &str) -> Result<(), DashboardError> {
        self.dispatch(Command::ToggleDate {
            date: date.to_string(),
        })
        .await
    }

    pub async fn start_polling(&self) -> Result<(), DashboardError> {
        self.dispatch(Command::StartPolling).await
    }

    pub async fn stop_polling(&self) -> Result<(), DashboardError> {
        self.dispatch(Command::StopPolling).await
    }

    pub async fn refresh_overview(&self) -> Result<(), DashboardError> {
        self.dispatch(Command::RefreshOverview).await
    }

    pub async fn dismiss_notice(&self, id: u64) -> Result<(), DashboardError> {
        self.dispatch(Command::DismissNotice { id }).await
    }

    pub async fn state(&self) -> DashboardState {
        self.state_manager.get_state().await
    }

    /// The catalog grouped with the stored query applied.
    pub async fn grouped_view(&self) -> GroupedView {
        let state = self.state().await;
        index::index(&state.catalog.reports, &state.query)
    }

    /// The catalog grouped under an ad-hoc query; the stored query is untouched.
    pub async fn grouped(&self, query: &str) -> GroupedView {
        let state = self.state().await;
        index::index(&state.catalog.reports, query)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreBroadcast> {
        self.broadcast_tx.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.event_tx.send(CoreEvent::Shutdown).await;
    }
}
