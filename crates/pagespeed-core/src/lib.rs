//! Backend-agnostic PageSpeed Insights normalization.
//!
//! Nothing in this crate performs I/O. Upstream reports come in through a [`ReportFetcher`]
//! (see `pagespeed-local` for the reqwest implementation) and leave as [`AnalysisResult`]s.

pub mod classify;
pub mod fanout;
pub mod model;
pub mod normalize;
pub mod raw;
pub mod triage;

pub use classify::{classify, MetricId, Rating};
pub use fanout::{
    resolve_strategies, strategy_or_default, AnalysisRequest, Coordinator, ReportFetcher,
};
pub use model::{
    AnalysisResult, AuditFinding, CategoryScores, CoreWebVitals, Impact, MetricValue, Opportunity,
};
pub use normalize::{normalize, normalize_at};
pub use raw::{LighthouseResult, RawAudit, RawReport};
pub use triage::{triage, Triage};

pub const STRATEGY_MOBILE: &str = "mobile";
pub const STRATEGY_DESKTOP: &str = "desktop";
pub const STRATEGY_BOTH: &str = "both";

/// Errors surfaced per (url, strategy) pair.
///
/// The `Display` output is exactly what ends up in [`AnalysisResult::error`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("PSI API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("parsing PSI response: {0}")]
    Parse(String),
    #[error("analysis cancelled before completion")]
    Cancelled,
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
