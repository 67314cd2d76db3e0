//! Client-side synchronization and orchestration for the fund report
//! dashboard: catalog refresh, grouped browsing, content loading, report
//! generation and overview polling, all driven by one `DashboardCore` loop.

pub mod catalog;
pub mod core;
pub mod error;
pub mod generation;
pub mod handle;
pub mod http;
pub mod index;
pub mod notices;
pub mod polling;
pub mod selection;
pub mod service;
pub mod state;

pub use crate::core::{CoreBroadcast, CoreConfig, CoreEvent, DashboardCore};
pub use crate::error::{DashboardError, Discard};
pub use crate::handle::DashboardHandle;
pub use crate::service::{HttpReportService, ReportService};
