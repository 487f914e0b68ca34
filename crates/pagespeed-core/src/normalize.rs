use crate::classify::{metric_from_raw, MetricId};
use crate::model::{scale_score, AnalysisResult, CategoryScores, CoreWebVitals, MetricValue};
use crate::raw::{LighthouseResult, RawReport};
use crate::triage::{triage, Triage};
use chrono::{DateTime, Utc};

/// Normalize one upstream report, stamped with the current time.
///
/// A missing report (or one without `lighthouseResult`) is not an error: it yields zero
/// scores, sentinel metrics, and empty triage lists.
pub fn normalize(url: &str, strategy: &str, raw: Option<&RawReport>) -> AnalysisResult {
    normalize_at(url, strategy, raw, Utc::now())
}

/// Same as [`normalize`] with an explicit `analyzed_at`, for reproducible output.
pub fn normalize_at(
    url: &str,
    strategy: &str,
    raw: Option<&RawReport>,
    analyzed_at: DateTime<Utc>,
) -> AnalysisResult {
    let Some(lhr) = raw.and_then(|r| r.lighthouse.as_ref()) else {
        return AnalysisResult::completed(
            url,
            strategy,
            analyzed_at,
            CategoryScores::default(),
            CoreWebVitals::default(),
            Triage::default(),
        );
    };

    AnalysisResult::completed(
        url,
        strategy,
        analyzed_at,
        category_scores(lhr),
        core_web_vitals(lhr),
        triage(&lhr.audits),
    )
}

fn category_scores(lhr: &LighthouseResult) -> CategoryScores {
    let score = |id: &str| lhr.category_score(id).map(scale_score).unwrap_or(0);
    CategoryScores {
        performance: score("performance"),
        seo: score("seo"),
        accessibility: score("accessibility"),
        best_practices: score("best-practices"),
    }
}

fn core_web_vitals(lhr: &LighthouseResult) -> CoreWebVitals {
    let metric = |id: MetricId| {
        lhr.audits
            .get(id.audit_id())
            .and_then(|a| a.numeric_value)
            .map(|v| metric_from_raw(id, v))
            .unwrap_or_else(MetricValue::absent)
    };
    CoreWebVitals {
        fcp: metric(MetricId::Fcp),
        lcp: metric(MetricId::Lcp),
        cls: metric(MetricId::Cls),
        tbt: metric(MetricId::Tbt),
        ttfb: metric(MetricId::Ttfb),
        speed_index: metric(MetricId::SpeedIndex),
    }
}
