//! Backend services the synchronization layer pulls from.
//!
//! `ReportService` is the seam between the orchestration core and the
//! network: the core only ever talks to the trait, `HttpReportService` is the
//! production implementation and tests substitute scripted ones.

use std::future::Future;
use std::time::Duration;

use fundboard_proto::config::ApiConfig;
use fundboard_proto::overview::OverviewSnapshot;
use fundboard_proto::report::{AssetKind, ReportSummary};
use fundboard_proto::settings::{SettingsData, SettingsUpdate};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::DashboardError;

pub trait ReportService: Send + Sync + 'static {
    /// Full report listing, in server order.
    fn fetch_reports(
        &self,
    ) -> impl Future<Output = Result<Vec<ReportSummary>, DashboardError>> + Send;

    /// Markdown body of one report.
    fn fetch_report_content(
        &self,
        filename: String,
    ) -> impl Future<Output = Result<String, DashboardError>> + Send;

    /// Run a generation job to completion.  The new report is visible through
    /// `fetch_reports` once this resolves successfully.
    fn generate_report(
        &self,
        asset: AssetKind,
    ) -> impl Future<Output = Result<(), DashboardError>> + Send;

    fn fetch_overview(&self)
        -> impl Future<Output = Result<OverviewSnapshot, DashboardError>> + Send;

    fn fetch_settings(&self) -> impl Future<Output = Result<SettingsData, DashboardError>> + Send;

    fn save_settings(
        &self,
        update: SettingsUpdate,
    ) -> impl Future<Output = Result<(), DashboardError>> + Send;
}

/// Resolve `fut`, turning an elapsed bound into `DashboardError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, DashboardError>
where
    F: Future<Output = Result<T, DashboardError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DashboardError::Timeout(limit)),
    }
}

#[derive(Deserialize)]
struct ReportContent {
    content: String,
}

/// reqwest client for the analysis backend.
#[derive(Debug, Clone)]
pub struct HttpReportService {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    generation_timeout: Duration,
}

impl HttpReportService {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("api.base_url {} cannot be used as a base URL", config.base_url);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("fundboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url,
            request_timeout: config.request_timeout(),
            generation_timeout: config.generation_timeout(),
        })
    }

    /// `base_url` joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, DashboardError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        let response = check_status(response)?;
        response
            .json()
            .await
            .map_err(|e| DashboardError::Network(format!("failed to decode response: {}", e)))
    }

    fn transport_error(&self, e: reqwest::Error, limit: Duration) -> DashboardError {
        if e.is_timeout() {
            DashboardError::Timeout(limit)
        } else {
            DashboardError::from(e)
        }
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DashboardError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DashboardError::Network(format!(
            "{} returned status: {}",
            response.url().path(),
            status
        )))
    }
}

impl ReportService for HttpReportService {
    async fn fetch_reports(&self) -> Result<Vec<ReportSummary>, DashboardError> {
        self.get_json(self.endpoint(&["api", "reports", "commodities"]))
            .await
    }

    async fn fetch_report_content(&self, filename: String) -> Result<String, DashboardError> {
        let url = self.endpoint(&["api", "reports", filename.as_str()]);
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DashboardError::NotFound(filename));
        }
        let body: ReportContent = check_status(response)?
            .json()
            .await
            .map_err(|e| DashboardError::Network(format!("failed to decode report: {}", e)))?;
        Ok(body.content)
    }

    async fn generate_report(&self, asset: AssetKind) -> Result<(), DashboardError> {
        let url = self.endpoint(&["api", "commodities", "analyze", asset.as_str()]);
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .timeout(self.generation_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.generation_timeout))?;
        check_status(response)?;
        Ok(())
    }

    async fn fetch_overview(&self) -> Result<OverviewSnapshot, DashboardError> {
        let raw: serde_json::Value = self
            .get_json(self.endpoint(&["api", "dashboard", "overview"]))
            .await?;
        Ok(OverviewSnapshot::from_value(raw))
    }

    async fn fetch_settings(&self) -> Result<SettingsData, DashboardError> {
        self.get_json(self.endpoint(&["api", "settings"])).await
    }

    async fn save_settings(&self, update: SettingsUpdate) -> Result<(), DashboardError> {
        let url = self.endpoint(&["api", "settings"]);
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&update)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        check_status(response)?;
        Ok(())
    }
}
