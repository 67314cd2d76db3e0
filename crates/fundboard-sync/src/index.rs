//! Date-grouped, search-filtered view over the report catalog.
//!
//! Everything here is a pure function of `(catalog, query)`; callers
//! recompute on every access instead of caching.

use std::collections::BTreeMap;

use fundboard_proto::report::{FundCode, ReportSummary};
use serde::Serialize;

/// One date bucket of the grouped view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateGroup {
    pub date: String,
    pub items: Vec<ReportSummary>,
}

pub type GroupedView = Vec<DateGroup>;

/// A report passes when its fund name contains `query` case-insensitively,
/// or its date contains `query` verbatim.  The empty query passes everything.
pub fn matches(report: &ReportSummary, query: &str) -> bool {
    report
        .fund_name
        .to_lowercase()
        .contains(&query.to_lowercase())
        || report.date.contains(query)
}

/// Filter, bucket by date (newest first), and put gold ahead of everything
/// else inside each bucket.  Entries with the same code keep catalog order.
pub fn index(catalog: &[ReportSummary], query: &str) -> GroupedView {
    let mut buckets: BTreeMap<&str, Vec<ReportSummary>> = BTreeMap::new();
    for report in catalog.iter().filter(|r| matches(r, query)) {
        buckets
            .entry(report.date.as_str())
            .or_default()
            .push(report.clone());
    }

    buckets
        .into_iter()
        .rev()
        .map(|(date, mut items)| {
            // sort_by_key is stable
            items.sort_by_key(|r| r.fund_code != FundCode::Gold);
            DateGroup {
                date: date.to_string(),
                items,
            }
        })
        .collect()
}

/// First entry under canonical ordering: newest date, gold before silver.
pub fn canonical_first(catalog: &[ReportSummary]) -> Option<ReportSummary> {
    index(catalog, "")
        .into_iter()
        .next()
        .and_then(|group| group.items.into_iter().next())
}

pub fn newest_date(catalog: &[ReportSummary]) -> Option<&str> {
    catalog.iter().map(|r| r.date.as_str()).max()
}
