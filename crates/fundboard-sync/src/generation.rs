//! Generation orchestrator — one report generation at a time.
//!
//! The lock is global: while a gold job runs, a silver trigger is rejected
//! too.  The lock is released by `settle`, whatever the job's outcome.

use std::time::Instant;

use fundboard_proto::protocol::{GenerationOutcome, GenerationState};
use fundboard_proto::report::AssetKind;
use tracing::{info, warn};

use crate::error::{DashboardError, Discard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub id: u64,
    pub asset: AssetKind,
}

#[derive(Debug)]
struct RunningJob {
    job: GenerationJob,
    started: Instant,
}

#[derive(Debug, Default)]
pub struct GenerationOrchestrator {
    running: Option<RunningJob>,
    last_outcome: Option<GenerationOutcome>,
    next_id: u64,
}

impl GenerationOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Take the lock for `asset`, or report which job holds it.
    pub fn try_begin(&mut self, asset: AssetKind) -> Result<GenerationJob, DashboardError> {
        if let Some(running) = &self.running {
            return Err(DashboardError::Busy(running.job.asset));
        }
        self.next_id += 1;
        let job = GenerationJob {
            id: self.next_id,
            asset,
        };
        info!("generation: job {} started for {}", job.id, asset);
        self.running = Some(RunningJob {
            job: job.clone(),
            started: Instant::now(),
        });
        Ok(job)
    }

    /// Release the lock for job `id` and record its outcome.
    pub fn settle(
        &mut self,
        id: u64,
        result: &Result<(), DashboardError>,
    ) -> Result<GenerationOutcome, Discard> {
        let running = match self.running.take() {
            Some(r) if r.job.id == id => r,
            other => {
                self.running = other;
                return Err(Discard::UnknownJob { id });
            }
        };

        let asset = running.job.asset;
        let elapsed = running.started.elapsed().as_secs();
        let (succeeded, message) = match result {
            Ok(()) => {
                info!("generation: job {} ({}) finished in {}s", id, asset, elapsed);
                (true, format!("{} analysis complete", asset.label()))
            }
            Err(e) => {
                warn!("generation: job {} ({}) failed after {}s: {}", id, asset, elapsed, e);
                (false, format!("{} analysis failed: {}", asset.label(), e))
            }
        };
        let outcome = GenerationOutcome {
            asset,
            succeeded,
            message,
            finished_at: chrono::Local::now(),
        };
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    pub fn state(&self) -> GenerationState {
        GenerationState {
            busy: self.is_busy(),
            running: self.running.as_ref().map(|r| r.job.asset),
            last_outcome: self.last_outcome.clone(),
        }
    }
}
