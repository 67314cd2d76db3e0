//! Selection & content loader.
//!
//! Each `begin` hands out a ticket carrying a monotonically increasing
//! sequence number.  A content response is applied only when its ticket is
//! the latest one issued and still names the current report; anything else
//! is a superseded fetch and is discarded.

use fundboard_proto::protocol::{LoadFailure, SelectionState};
use fundboard_proto::report::ReportSummary;
use tracing::{debug, warn};

use crate::error::{DashboardError, Discard};

/// Identifies one content request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTicket {
    pub seq: u64,
    pub filename: String,
}

#[derive(Debug, Default)]
pub struct SelectionLoader {
    current: Option<ReportSummary>,
    content: String,
    loading: bool,
    error: Option<LoadFailure>,
    latest: u64,
}

impl SelectionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ReportSummary> {
        self.current.as_ref()
    }

    /// Make `report` current and tag the fetch that should load it.
    pub fn begin(&mut self, report: ReportSummary) -> ContentTicket {
        self.latest += 1;
        let ticket = ContentTicket {
            seq: self.latest,
            filename: report.filename.clone(),
        };
        debug!("selection: #{} -> {}", ticket.seq, ticket.filename);
        self.current = Some(report);
        self.loading = true;
        self.error = None;
        ticket
    }

    /// Apply a content response.  On failure the previous content stays on
    /// display and the failure is recorded next to it.
    pub fn apply(
        &mut self,
        ticket: ContentTicket,
        result: Result<String, DashboardError>,
    ) -> Result<(), Discard> {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|r| r.filename == ticket.filename);
        if ticket.seq != self.latest || !is_current {
            return Err(Discard::StaleContent {
                filename: ticket.filename,
                seq: ticket.seq,
                latest: self.latest,
            });
        }

        self.loading = false;
        match result {
            Ok(content) => {
                self.content = content;
                self.error = None;
            }
            Err(e) => {
                warn!("selection: failed to load {}: {}", ticket.filename, e);
                self.error = Some(e.failure());
            }
        }
        Ok(())
    }

    pub fn state(&self) -> SelectionState {
        SelectionState {
            current: self.current.clone(),
            content: self.content.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}
