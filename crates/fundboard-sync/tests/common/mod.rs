//! Scripted backend and a hand-driven core for orchestration tests.
//!
//! `ScriptedService` forwards every call to the test as a `Call` carrying a
//! responder, so the test decides when and how each request resolves, and in
//! which order.  `Harness` owns a `DashboardCore` without running its loop;
//! completion events are pulled off the channel and fed in explicitly.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fundboard_proto::overview::OverviewSnapshot;
use fundboard_proto::protocol::{Command, DashboardState};
use fundboard_proto::report::{AssetKind, FundCode, ReportSummary};
use fundboard_proto::settings::{SettingsData, SettingsUpdate};
use fundboard_sync::{
    CoreBroadcast, CoreConfig, CoreEvent, DashboardCore, DashboardError, DashboardHandle,
    Discard, ReportService,
};
use tokio::sync::{broadcast, mpsc, oneshot};

const WAIT: Duration = Duration::from_secs(30);

pub type Responder<T> = oneshot::Sender<Result<T, DashboardError>>;

#[derive(Debug)]
pub enum Call {
    Reports(Responder<Vec<ReportSummary>>),
    Content(String, Responder<String>),
    Generate(AssetKind, Responder<()>),
    Overview(Responder<OverviewSnapshot>),
    Settings(Responder<SettingsData>),
    SaveSettings(SettingsUpdate, Responder<()>),
}

pub struct ScriptedService {
    calls: mpsc::UnboundedSender<Call>,
}

impl ScriptedService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (Self { calls }, rx)
    }

    async fn call<T>(&self, make: impl FnOnce(Responder<T>) -> Call) -> Result<T, DashboardError> {
        let (tx, rx) = oneshot::channel();
        self.calls
            .send(make(tx))
            .map_err(|_| DashboardError::Network("script closed".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(DashboardError::Network("responder dropped".into())))
    }
}

impl ReportService for ScriptedService {
    async fn fetch_reports(&self) -> Result<Vec<ReportSummary>, DashboardError> {
        self.call(Call::Reports).await
    }

    async fn fetch_report_content(&self, filename: String) -> Result<String, DashboardError> {
        self.call(|r| Call::Content(filename, r)).await
    }

    async fn generate_report(&self, asset: AssetKind) -> Result<(), DashboardError> {
        self.call(|r| Call::Generate(asset, r)).await
    }

    async fn fetch_overview(&self) -> Result<OverviewSnapshot, DashboardError> {
        self.call(Call::Overview).await
    }

    async fn fetch_settings(&self) -> Result<SettingsData, DashboardError> {
        self.call(Call::Settings).await
    }

    async fn save_settings(&self, update: SettingsUpdate) -> Result<(), DashboardError> {
        self.call(|r| Call::SaveSettings(update, r)).await
    }
}

pub fn report(filename: &str, code: FundCode, date: &str) -> ReportSummary {
    ReportSummary {
        filename: filename.to_string(),
        fund_name: format!("{:?} fund", code),
        fund_code: code,
        date: date.to_string(),
    }
}

pub fn test_config() -> CoreConfig {
    CoreConfig {
        request_timeout: Duration::from_secs(5),
        generation_timeout: Duration::from_secs(20),
        overview_interval: Duration::from_secs(10),
        ..CoreConfig::default()
    }
}

pub struct Harness {
    pub core: DashboardCore<ScriptedService>,
    pub events: mpsc::Receiver<CoreEvent>,
    pub calls: mpsc::UnboundedReceiver<Call>,
    pub broadcasts: broadcast::Receiver<CoreBroadcast>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        let (service, calls) = ScriptedService::new();
        let (broadcast_tx, broadcasts) = broadcast::channel(256);
        let (event_tx, events) = mpsc::channel(256);
        let core = DashboardCore::new(config, Arc::new(service), broadcast_tx, event_tx);
        Self {
            core,
            events,
            calls,
            broadcasts,
        }
    }

    pub async fn cmd(&mut self, cmd: Command) -> Result<(), DashboardError> {
        self.core.dispatch(cmd).await
    }

    pub async fn next_call(&mut self) -> Call {
        tokio::time::timeout(WAIT, self.calls.recv())
            .await
            .expect("timed out waiting for a service call")
            .expect("service dropped")
    }

    pub fn assert_no_call(&mut self) {
        if let Ok(call) = self.calls.try_recv() {
            panic!("unexpected service call: {:?}", call);
        }
    }

    pub async fn next_event(&mut self) -> CoreEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for a core event")
            .expect("event channel closed")
    }

    /// Feed the next completion into the core.
    pub async fn pump(&mut self) {
        let event = self.next_event().await;
        assert!(self.core.handle_event(event).await);
    }

    pub async fn state(&self) -> DashboardState {
        self.core.state_manager().get_state().await
    }

    /// Discards broadcast since the last call.
    pub fn discards(&mut self) -> Vec<Discard> {
        let mut out = Vec::new();
        while let Ok(msg) = self.broadcasts.try_recv() {
            if let CoreBroadcast::Discarded(d) = msg {
                out.push(d);
            }
        }
        out
    }

    /// Load `reports` as the catalog and answer the auto-selection with
    /// `"initial"`.
    pub async fn seed(&mut self, reports: Vec<ReportSummary>) {
        let had_selection = self.state().await.selection.current.is_some();
        self.cmd(Command::Refresh).await.unwrap();
        match self.next_call().await {
            Call::Reports(r) => r.send(Ok(reports.clone())).unwrap(),
            other => panic!("expected listing call, got {:?}", other),
        }
        self.pump().await;

        if !had_selection && !reports.is_empty() {
            match self.next_call().await {
                Call::Content(_, r) => r.send(Ok("initial".into())).unwrap(),
                other => panic!("expected content call, got {:?}", other),
            }
            self.pump().await;
        }
    }
}

/// A core running its own loop, for tests that go through a `DashboardHandle`.
pub fn spawn_core() -> (DashboardHandle, mpsc::UnboundedReceiver<Call>) {
    let (service, calls) = ScriptedService::new();
    let (broadcast_tx, _) = broadcast::channel(256);
    let (event_tx, event_rx) = mpsc::channel(256);
    let core = DashboardCore::new(test_config(), Arc::new(service), broadcast_tx, event_tx);
    let handle = core.handle();
    tokio::spawn(core.run(event_rx));
    (handle, calls)
}

pub async fn recv_call(calls: &mut mpsc::UnboundedReceiver<Call>) -> Call {
    tokio::time::timeout(WAIT, calls.recv())
        .await
        .expect("timed out waiting for a service call")
        .expect("service dropped")
}
