//! Catalog store — the canonical report list and its browse state.

use std::collections::{BTreeSet, HashSet};

use fundboard_proto::protocol::{CatalogState, LoadFailure};
use fundboard_proto::report::ReportSummary;
use tracing::{info, warn};

use crate::error::{DashboardError, Discard};
use crate::index;

/// Result of applying a listing completion.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Catalog replaced.  `first` is the canonical first entry when the new
    /// catalog is non-empty.
    Applied { first: Option<ReportSummary> },
    /// Listing failed; the previous catalog is untouched.
    Failed,
    /// Superseded by a newer listing that was already applied.
    Discarded(Discard),
}

#[derive(Debug, Default)]
pub struct CatalogStore {
    reports: Vec<ReportSummary>,
    expanded_dates: BTreeSet<String>,
    last_error: Option<LoadFailure>,
    /// Last sequence number handed out.
    issued: u64,
    /// Sequence number of the listing currently shown.
    applied: u64,
    in_flight: usize,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[ReportSummary] {
        &self.reports
    }

    pub fn find(&self, filename: &str) -> Option<&ReportSummary> {
        self.reports.iter().find(|r| r.filename == filename)
    }

    /// Tag a new listing request.
    pub fn begin_refresh(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    /// Apply listing `seq`.  Only a listing newer than the one on display
    /// replaces the catalog, so a slow, older request never wins.
    pub fn apply(
        &mut self,
        seq: u64,
        result: Result<Vec<ReportSummary>, DashboardError>,
    ) -> RefreshOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);

        if seq <= self.applied {
            return RefreshOutcome::Discarded(Discard::StaleCatalog {
                seq,
                applied: self.applied,
            });
        }

        match result {
            Ok(listing) => {
                self.reports = dedup_by_filename(listing);
                self.applied = seq;
                self.last_error = None;
                info!("catalog: listing #{} applied ({} reports)", seq, self.reports.len());

                if let Some(newest) = index::newest_date(&self.reports) {
                    self.expanded_dates = BTreeSet::from([newest.to_string()]);
                }
                RefreshOutcome::Applied {
                    first: index::canonical_first(&self.reports),
                }
            }
            Err(e) => {
                warn!("catalog: listing #{} failed: {}", seq, e);
                self.last_error = Some(e.failure());
                RefreshOutcome::Failed
            }
        }
    }

    /// Flip a date group between expanded and collapsed.
    pub fn toggle_date(&mut self, date: &str) {
        if !self.expanded_dates.remove(date) {
            self.expanded_dates.insert(date.to_string());
        }
    }

    pub fn state(&self) -> CatalogState {
        CatalogState {
            reports: self.reports.clone(),
            expanded_dates: self.expanded_dates.iter().rev().cloned().collect(),
            refreshing: self.in_flight > 0,
            last_error: self.last_error.clone(),
        }
    }
}

fn dedup_by_filename(listing: Vec<ReportSummary>) -> Vec<ReportSummary> {
    let mut seen = HashSet::new();
    let before = listing.len();
    let reports: Vec<ReportSummary> = listing
        .into_iter()
        .filter(|r| seen.insert(r.filename.clone()))
        .collect();
    if reports.len() != before {
        warn!(
            "catalog: dropped {} duplicate filename(s) from listing",
            before - reports.len()
        );
    }
    reports
}
