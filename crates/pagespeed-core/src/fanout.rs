//! Concurrent fan-out over `urls x strategies`.
//!
//! Every (url, strategy) pair becomes one future; all of them are polled together and joined
//! once. `join_all` yields outputs in input order, so the result sequence follows the request
//! expansion no matter which fetch finishes first.

use crate::model::AnalysisResult;
use crate::normalize::normalize;
use crate::raw::RawReport;
use crate::{Error, Result, STRATEGY_BOTH, STRATEGY_DESKTOP, STRATEGY_MOBILE};
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub url: String,
    pub strategy: String,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strategy: strategy.into(),
        }
    }
}

/// Upstream transport. Implementations own timeouts; the coordinator never retries.
#[async_trait::async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch(&self, req: &AnalysisRequest, cancel: &CancellationToken) -> Result<RawReport>;
}

/// `"both"` (any case) expands to mobile then desktop; anything else is lower-cased and passed
/// through unchecked.
pub fn resolve_strategies(selector: &str) -> Vec<String> {
    if selector.eq_ignore_ascii_case(STRATEGY_BOTH) {
        vec![STRATEGY_MOBILE.to_string(), STRATEGY_DESKTOP.to_string()]
    } else {
        vec![selector.to_lowercase()]
    }
}

/// Caller-facing selector: missing or blank means [`STRATEGY_BOTH`], anything else is trimmed.
pub fn strategy_or_default(selector: Option<&str>) -> String {
    selector
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(STRATEGY_BOTH)
        .to_string()
}

/// Outer loop over urls, inner loop over strategies.
pub fn expand_requests(urls: &[String], selector: &str) -> Vec<AnalysisRequest> {
    let strategies = resolve_strategies(selector);
    urls.iter()
        .flat_map(|u| strategies.iter().map(move |s| AnalysisRequest::new(u.as_str(), s.as_str())))
        .collect()
}

#[derive(Clone)]
pub struct Coordinator {
    fetcher: Arc<dyn ReportFetcher>,
}

impl Coordinator {
    pub fn new(fetcher: Arc<dyn ReportFetcher>) -> Self {
        Self { fetcher }
    }

    /// Analyze every (url, strategy) pair concurrently.
    ///
    /// Always returns one result per pair, in expansion order. Failures, panics inside the
    /// fetcher, and cancellation each turn into an error result for the affected pair only.
    pub async fn run(
        &self,
        urls: &[String],
        selector: &str,
        cancel: &CancellationToken,
    ) -> Vec<AnalysisResult> {
        let requests = expand_requests(urls, selector);
        debug!(
            urls = urls.len(),
            pairs = requests.len(),
            selector,
            "starting fan-out"
        );
        join_all(requests.into_iter().map(|req| self.analyze_one(req, cancel))).await
    }

    async fn analyze_one(&self, req: AnalysisRequest, cancel: &CancellationToken) -> AnalysisResult {
        let fetch = AssertUnwindSafe(self.fetcher.fetch(&req, cancel)).catch_unwind();
        let outcome = match cancel.run_until_cancelled(fetch).await {
            None => Err(Error::Cancelled),
            Some(Ok(r)) => r,
            Some(Err(panic)) => Err(Error::Internal(format!(
                "fetch panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        match outcome {
            Ok(raw) => {
                debug!(url = %req.url, strategy = %req.strategy, "report fetched");
                normalize(&req.url, &req.strategy, Some(&raw))
            }
            Err(e) => {
                warn!(
                    url = %req.url,
                    strategy = %req.strategy,
                    error = %e,
                    "PSI analysis failed"
                );
                AnalysisResult::failed(req.url, req.strategy, Utc::now(), e)
            }
        }
    }
}

fn panic_message(p: &(dyn Any + Send)) -> String {
    if let Some(s) = p.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = p.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
