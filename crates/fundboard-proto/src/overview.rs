//! Schema for the dashboard overview payload.
//!
//! The backend assembles the overview from several independent market data
//! sources, any of which can be missing or half-populated on a given poll.
//! Every section is therefore optional and decoded on its own: a malformed
//! section degrades to "no data" instead of discarding the whole snapshot.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewSnapshot {
    pub market_overview: Option<MarketOverview>,
    pub gold_macro: Option<GoldMacro>,
    pub sectors: Option<Sectors>,
    #[serde(default)]
    pub abnormal_movements: Vec<AbnormalMovement>,
    #[serde(default)]
    pub top_flows: Vec<FlowRow>,
    pub system_stats: Option<SystemStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketOverview {
    pub indices: Vec<IndexQuote>,
    pub breadth: Option<Breadth>,
    pub turnover: Option<Turnover>,
    /// Net main-force flow, in the backend's display unit.
    pub main_flow: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexQuote {
    pub name: String,
    pub price: Option<f64>,
    /// Percent change.
    pub change: Option<f64>,
}

/// Advance/decline counts.  Missing counters read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breadth {
    pub up: u32,
    pub down: u32,
    pub flat: u32,
    pub limit_up: u32,
    pub limit_down: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Turnover {
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldMacro {
    pub price: Option<f64>,
    pub change_pct: Option<f64>,
    pub dxy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sectors {
    /// Best first.
    pub gainers: Vec<SectorMove>,
    /// Ordered like the gainers list, so the worst performer is last.
    pub losers: Vec<SectorMove>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorMove {
    pub name: String,
    pub change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbnormalMovement {
    pub name: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub info: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowRow {
    pub code: String,
    pub name: String,
    pub change_pct: Option<f64>,
    pub net_buy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub total: u64,
    pub breakdown: Option<ReportBreakdown>,
}

/// Report counts split by trading session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportBreakdown {
    pub pre: u64,
    pub post: u64,
}

impl OverviewSnapshot {
    /// Decode a raw payload section by section.  Non-object payloads yield
    /// an empty snapshot.
    pub fn from_value(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(mut obj) = value else {
            warn!("overview: payload is not an object, rendering empty snapshot");
            return Self::default();
        };

        Self {
            market_overview: section(&mut obj, "market_overview"),
            gold_macro: section(&mut obj, "gold_macro"),
            sectors: section(&mut obj, "sectors"),
            abnormal_movements: section(&mut obj, "abnormal_movements").unwrap_or_default(),
            top_flows: section(&mut obj, "top_flows").unwrap_or_default(),
            system_stats: section(&mut obj, "system_stats"),
        }
    }

    /// Breadth with the all-zero fallback applied.
    pub fn breadth(&self) -> Breadth {
        self.market_overview
            .as_ref()
            .and_then(|m| m.breadth)
            .unwrap_or_default()
    }

    /// True when no section carried any data.
    pub fn is_empty(&self) -> bool {
        self.market_overview.is_none()
            && self.gold_macro.is_none()
            && self.sectors.is_none()
            && self.abnormal_movements.is_empty()
            && self.top_flows.is_empty()
            && self.system_stats.is_none()
    }
}

fn section<T: DeserializeOwned>(
    obj: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<T> {
    match obj.remove(key) {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => match serde_json::from_value(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("overview: dropping malformed section {}: {}", key, e);
                None
            }
        },
    }
}

impl Breadth {
    /// Total counted instruments, never zero so ratios stay finite.
    pub fn total(&self) -> u64 {
        (u64::from(self.up) + u64::from(self.down) + u64::from(self.flat)).max(1)
    }

    /// Share of advancing instruments in percent.
    pub fn up_ratio(&self) -> f64 {
        f64::from(self.up) / self.total() as f64 * 100.0
    }
}

impl Sectors {
    pub fn top_gainers(&self, n: usize) -> &[SectorMove] {
        &self.gainers[..n.min(self.gainers.len())]
    }

    /// The `n` worst performers, worst first.
    pub fn top_losers(&self, n: usize) -> Vec<&SectorMove> {
        self.losers.iter().rev().take(n).collect()
    }
}

impl AbnormalMovement {
    /// `info` without the backend's `"Code: "` prefix.
    pub fn info_label(&self) -> &str {
        self.info.strip_prefix("Code: ").unwrap_or(&self.info)
    }
}
