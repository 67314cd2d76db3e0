//! Overview poller bound to the lifetime of the view that started it.
//!
//! The poller is a single task that requests the overview, waits for the
//! answer, then waits for the next tick.  Requests never overlap because the
//! task only ticks again once the previous request has resolved; ticks missed
//! meanwhile are skipped.  Dropping the `PollingScheduler` cancels the task,
//! and every result it emits carries the scheduler's epoch so the core can
//! ignore anything produced by a scheduler that is no longer active.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::CoreEvent;
use crate::service::{with_timeout, ReportService};

pub struct PollingScheduler {
    epoch: u64,
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PollingScheduler {
    /// Spawn the poll loop.  The first request goes out immediately.
    pub fn start<S: ReportService>(
        service: Arc<S>,
        epoch: u64,
        period: Duration,
        request_timeout: Duration,
        event_tx: mpsc::Sender<CoreEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());

        let task = tokio::spawn(poll_loop(
            service,
            epoch,
            period,
            request_timeout,
            event_tx,
            cancel.clone(),
            Arc::clone(&trigger),
        ));
        info!("overview: poller {} started (every {}s)", epoch, period.as_secs());

        Self {
            epoch,
            cancel,
            trigger,
            task,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Poll now instead of waiting for the next tick.  Coalesces with a
    /// request that is already outstanding.
    pub fn poll_now(&self) {
        self.trigger.notify_one();
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        info!("overview: poller {} stopped", self.epoch);
    }
}

async fn poll_loop<S: ReportService>(
    service: Arc<S>,
    epoch: u64,
    period: Duration,
    request_timeout: Duration,
    event_tx: mpsc::Sender<CoreEvent>,
    cancel: CancellationToken,
    trigger: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = trigger.notified() => ticker.reset(),
        }

        debug!("overview: poller {} requesting snapshot", epoch);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            r = with_timeout(request_timeout, service.fetch_overview()) => r,
        };

        if event_tx
            .send(CoreEvent::OverviewLoaded { epoch, result })
            .await
            .is_err()
        {
            break;
        }
    }
    debug!("overview: poller {} loop exited", epoch);
}
