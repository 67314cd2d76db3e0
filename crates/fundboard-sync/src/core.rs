/// DashboardCore — single-owner event loop for all dashboard state.
///
/// Every operation the presentation layer can trigger arrives as a
/// `CoreEvent::Command`; every network call runs in its own task and comes
/// back as a completion event.  DashboardCore owns the catalog, selection,
/// generation lock and poller exclusively; no other task touches them.
///
/// Completions can arrive in any order.  Those that can be superseded carry
/// a tag (listing sequence, content ticket, poller epoch, job id) and are
/// checked against the current owner state before being applied; stale ones
/// are dropped and broadcast as `CoreBroadcast::Discarded`.
///
/// After each event DashboardCore republishes `DashboardState` through the
/// `StateManager` and, if it changed, broadcasts `CoreBroadcast::StateUpdated`.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fundboard_proto::config::{Config, NoticeConfig};
use fundboard_proto::overview::OverviewSnapshot;
use fundboard_proto::protocol::{Command, DashboardState, LoadFailure, Notice, OverviewState};
use fundboard_proto::report::{AssetKind, ReportSummary};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogStore, RefreshOutcome};
use crate::error::{DashboardError, Discard};
use crate::generation::{GenerationJob, GenerationOrchestrator};
use crate::handle::DashboardHandle;
use crate::notices::NoticeBoard;
use crate::polling::PollingScheduler;
use crate::selection::{ContentTicket, SelectionLoader};
use crate::service::{with_timeout, ReportService};
use crate::state::StateManager;

/// How often expired notices are swept.
const HOUSEKEEPING_PERIOD: Duration = Duration::from_secs(1);

pub type Reply = oneshot::Sender<Result<(), DashboardError>>;

/// What DashboardCore broadcasts to observers.
#[derive(Debug, Clone)]
pub enum CoreBroadcast {
    /// The published `DashboardState` changed; read it from the StateManager.
    StateUpdated,
    /// A notice was raised.
    Notice(Notice),
    /// An async completion was dropped as superseded.
    Discarded(Discard),
}

// ── CoreEvent ────────────────────────────────────────────────────────────────

/// All inputs into the DashboardCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    /// An operation from a handle or the HTTP API.  `reply` receives the
    /// outcome once the resulting state has been published.
    Command {
        cmd: Command,
        reply: Option<Reply>,
    },
    CatalogLoaded {
        seq: u64,
        result: Result<Vec<ReportSummary>, DashboardError>,
    },
    ContentLoaded {
        ticket: ContentTicket,
        result: Result<String, DashboardError>,
    },
    GenerationSettled {
        job: GenerationJob,
        result: Result<(), DashboardError>,
    },
    OverviewLoaded {
        epoch: u64,
        result: Result<OverviewSnapshot, DashboardError>,
    },
    /// Periodic maintenance (notice expiry).
    HousekeepingTick,
    Shutdown,
}

/// Timing knobs, taken from the on-disk config.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub request_timeout: Duration,
    pub generation_timeout: Duration,
    pub overview_interval: Duration,
    pub notices: NoticeConfig,
}

impl CoreConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: config.api.request_timeout(),
            generation_timeout: config.api.generation_timeout(),
            overview_interval: config.polling.overview_interval(),
            notices: config.notices.clone(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ── DashboardCore ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct OverviewSlot {
    loading: bool,
    snapshot: Option<OverviewSnapshot>,
    last_error: Option<LoadFailure>,
    fetched_at: Option<chrono::DateTime<chrono::Local>>,
}

pub struct DashboardCore<S: ReportService> {
    config: CoreConfig,
    service: Arc<S>,
    state_manager: Arc<StateManager>,
    broadcast_tx: broadcast::Sender<CoreBroadcast>,
    /// Handed to request tasks so completions come back into this loop.
    event_tx: mpsc::Sender<CoreEvent>,

    catalog: CatalogStore,
    query: String,
    selection: SelectionLoader,
    generation: GenerationOrchestrator,
    overview: OverviewSlot,
    /// Present exactly while overview polling is active.
    poller: Option<PollingScheduler>,
    poll_epoch: u64,
    notices: NoticeBoard,

    /// Outstanding request tasks, aborted on shutdown.
    in_flight: Vec<AbortHandle>,
}

impl<S: ReportService> DashboardCore<S> {
    pub fn new(
        config: CoreConfig,
        service: Arc<S>,
        broadcast_tx: broadcast::Sender<CoreBroadcast>,
        event_tx: mpsc::Sender<CoreEvent>,
    ) -> Self {
        let notices = NoticeBoard::new(&config.notices);
        Self {
            config,
            service,
            state_manager: Arc::new(StateManager::new()),
            broadcast_tx,
            event_tx,
            catalog: CatalogStore::new(),
            query: String::new(),
            selection: SelectionLoader::new(),
            generation: GenerationOrchestrator::new(),
            overview: OverviewSlot::default(),
            poller: None,
            poll_epoch: 0,
            notices,
            in_flight: Vec::new(),
        }
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    pub fn handle(&self) -> DashboardHandle {
        DashboardHandle::new(
            self.event_tx.clone(),
            self.state_manager(),
            self.broadcast_tx.clone(),
        )
    }

    /// Run the core event loop.  Returns when a `Shutdown` event is received
    /// or every sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) {
        info!("DashboardCore: starting event loop");

        let mut housekeeping = tokio::time::interval(HOUSEKEEPING_PERIOD);
        housekeeping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let event = tokio::select! {
                evt = event_rx.recv() => match evt {
                    Some(evt) => evt,
                    None => {
                        info!("DashboardCore: event channel closed, shutting down");
                        break;
                    }
                },
                _ = housekeeping.tick() => CoreEvent::HousekeepingTick,
            };

            if !self.handle_event(event).await {
                info!("DashboardCore: shutdown requested");
                break;
            }
        }

        self.shutdown();
    }

    /// Apply one event and republish.  Returns `false` on shutdown.
    pub async fn handle_event(&mut self, event: CoreEvent) -> bool {
        match event {
            CoreEvent::Shutdown => return false,

            CoreEvent::Command { cmd, reply } => {
                let result = self.dispatch(cmd).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
                return true;
            }

            CoreEvent::CatalogLoaded { seq, result } => self.on_catalog_loaded(seq, result),

            CoreEvent::ContentLoaded { ticket, result } => {
                if let Err(discard) = self.selection.apply(ticket, result) {
                    self.discarded(discard);
                }
            }

            CoreEvent::GenerationSettled { job, result } => {
                self.on_generation_settled(job, result)
            }

            CoreEvent::OverviewLoaded { epoch, result } => self.on_overview_loaded(epoch, result),

            CoreEvent::HousekeepingTick => {
                self.notices.sweep();
            }
        }

        self.publish().await;
        true
    }

    /// Execute a command and publish the resulting state before returning.
    pub async fn dispatch(&mut self, cmd: Command) -> Result<(), DashboardError> {
        debug!("DashboardCore: command {:?}", cmd);
        let result = self.apply_command(cmd);
        if let Err(e) = &result {
            warn!("DashboardCore: command rejected: {}", e);
        }
        self.publish().await;
        result
    }

    fn apply_command(&mut self, cmd: Command) -> Result<(), DashboardError> {
        match cmd {
            Command::Refresh => self.refresh(),
            Command::Select { report } => self.select(report),
            Command::SelectFilename { filename } => {
                let report = self
                    .catalog
                    .find(&filename)
                    .cloned()
                    .ok_or(DashboardError::NotFound(filename))?;
                self.select(report);
            }
            Command::Generate { asset } => self.generate(asset)?,
            Command::SetQuery { query } => self.query = query,
            Command::ToggleDate { date } => self.catalog.toggle_date(&date),
            Command::StartPolling => self.start_polling(),
            Command::StopPolling => self.stop_polling(),
            Command::RefreshOverview => match &self.poller {
                Some(poller) => {
                    poller.poll_now();
                    self.overview.loading = true;
                }
                None => debug!("DashboardCore: overview refresh ignored, polling inactive"),
            },
            Command::DismissNotice { id } => {
                self.notices.dismiss(id);
            }
        }
        Ok(())
    }

    // ── Catalog ──────────────────────────────────────────────────────────────

    fn refresh(&mut self) {
        let seq = self.catalog.begin_refresh();
        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        let limit = self.config.request_timeout;
        self.spawn_request(async move {
            let result = with_timeout(limit, service.fetch_reports()).await;
            let _ = tx.send(CoreEvent::CatalogLoaded { seq, result }).await;
        });
    }

    fn on_catalog_loaded(&mut self, seq: u64, result: Result<Vec<ReportSummary>, DashboardError>) {
        match self.catalog.apply(seq, result) {
            RefreshOutcome::Applied { first: Some(first) } if self.selection.current().is_none() => {
                info!("DashboardCore: auto-selecting {}", first.filename);
                self.select(first);
            }
            RefreshOutcome::Applied { .. } | RefreshOutcome::Failed => {}
            RefreshOutcome::Discarded(discard) => self.discarded(discard),
        }
    }

    // ── Selection ────────────────────────────────────────────────────────────

    fn select(&mut self, report: ReportSummary) {
        let ticket = self.selection.begin(report);
        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        let limit = self.config.request_timeout;
        self.spawn_request(async move {
            let result = with_timeout(limit, service.fetch_report_content(ticket.filename.clone())).await;
            let _ = tx.send(CoreEvent::ContentLoaded { ticket, result }).await;
        });
    }

    // ── Generation ───────────────────────────────────────────────────────────

    fn generate(&mut self, asset: AssetKind) -> Result<(), DashboardError> {
        let job = self.generation.try_begin(asset)?;
        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        let limit = self.config.generation_timeout;
        self.spawn_request(async move {
            let result = with_timeout(limit, service.generate_report(job.asset)).await;
            let _ = tx.send(CoreEvent::GenerationSettled { job, result }).await;
        });
        Ok(())
    }

    fn on_generation_settled(&mut self, job: GenerationJob, result: Result<(), DashboardError>) {
        match self.generation.settle(job.id, &result) {
            Ok(outcome) if outcome.succeeded => {
                let notice = self.notices.success(outcome.message);
                self.raise(notice);
                self.refresh();
            }
            Ok(outcome) => {
                let notice = self.notices.error(outcome.message);
                self.raise(notice);
            }
            Err(discard) => self.discarded(discard),
        }
    }

    // ── Overview polling ─────────────────────────────────────────────────────

    fn start_polling(&mut self) {
        if self.poller.is_some() {
            debug!("DashboardCore: polling already active");
            return;
        }
        self.poll_epoch += 1;
        self.poller = Some(PollingScheduler::start(
            Arc::clone(&self.service),
            self.poll_epoch,
            self.config.overview_interval,
            self.config.request_timeout,
            self.event_tx.clone(),
        ));
        self.overview.loading = self.overview.snapshot.is_none();
    }

    fn stop_polling(&mut self) {
        // Dropping the scheduler cancels its task; results already queued
        // carry its epoch and are discarded on arrival.
        if self.poller.take().is_some() {
            self.overview = OverviewSlot::default();
        }
    }

    fn on_overview_loaded(&mut self, epoch: u64, result: Result<OverviewSnapshot, DashboardError>) {
        let active = self.poller.as_ref().map(PollingScheduler::epoch);
        if active != Some(epoch) {
            self.discarded(Discard::InactivePoller { epoch });
            return;
        }

        self.overview.loading = false;
        match result {
            Ok(snapshot) => {
                self.overview.snapshot = Some(snapshot);
                self.overview.last_error = None;
                self.overview.fetched_at = Some(chrono::Local::now());
            }
            Err(e) => {
                // Keep the previous snapshot; the next tick retries.
                warn!("DashboardCore: overview poll failed: {}", e);
                self.overview.last_error = Some(e.failure());
            }
        }
    }

    // ── Plumbing ─────────────────────────────────────────────────────────────

    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.retain(|h| !h.is_finished());
        self.in_flight.push(tokio::spawn(request).abort_handle());
    }

    fn discarded(&self, discard: Discard) {
        debug!("DashboardCore: discarded {}", discard);
        let _ = self.broadcast_tx.send(CoreBroadcast::Discarded(discard));
    }

    fn raise(&self, notice: Notice) {
        info!("DashboardCore: notice {:?}: {}", notice.severity, notice.message);
        let _ = self.broadcast_tx.send(CoreBroadcast::Notice(notice));
    }

    fn snapshot(&self) -> DashboardState {
        DashboardState {
            rev: 0,
            catalog: self.catalog.state(),
            query: self.query.clone(),
            selection: self.selection.state(),
            generation: self.generation.state(),
            overview: OverviewState {
                active: self.poller.is_some(),
                loading: self.overview.loading,
                snapshot: self.overview.snapshot.clone(),
                last_error: self.overview.last_error.clone(),
                fetched_at: self.overview.fetched_at,
            },
            notices: self.notices.notices(),
        }
    }

    async fn publish(&self) {
        if self.state_manager.publish(self.snapshot()).await {
            let _ = self.broadcast_tx.send(CoreBroadcast::StateUpdated);
        }
    }

    fn shutdown(&mut self) {
        self.poller = None;
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
        info!("DashboardCore: stopped");
    }
}
