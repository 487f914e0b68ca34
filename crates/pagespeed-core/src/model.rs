//! Normalized result records.
//!
//! These are the shapes handed to tool callers. Serialized keys are camelCase and absent
//! optionals are omitted, except `MetricValue::rating`, which is `""` when the metric was
//! missing upstream.

use crate::classify::Rating;
use crate::triage::Triage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category scores on a 0–100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub performance: u8,
    pub seo: u8,
    pub accessibility: u8,
    pub best_practices: u8,
}

/// Scale a Lighthouse `0.0..=1.0` score to `0..=100`, rounding half away from zero.
pub fn scale_score(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(default, with = "rating_or_empty")]
    rating: Option<Rating>,
}

impl MetricValue {
    pub fn rated(value: f64, unit: Option<&str>, rating: Rating) -> Self {
        Self {
            value,
            unit: unit.map(str::to_string),
            rating: Some(rating),
        }
    }

    /// The `{0, absent, ""}` sentinel for a metric Lighthouse did not report.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    pub fn is_absent(&self) -> bool {
        self.rating.is_none()
    }
}

mod rating_or_empty {
    use crate::classify::Rating;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(r: &Option<Rating>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(r.map(Rating::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Rating>, D::Error> {
        let s = String::deserialize(d)?;
        if s.is_empty() {
            return Ok(None);
        }
        Rating::parse(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown rating {s:?}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreWebVitals {
    pub fcp: MetricValue,
    pub lcp: MetricValue,
    pub cls: MetricValue,
    pub tbt: MetricValue,
    pub ttfb: MetricValue,
    pub speed_index: MetricValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub const HIGH_BELOW: f64 = 0.50;
    pub const MEDIUM_BELOW: f64 = 0.75;

    pub fn from_score(score: f64) -> Self {
        if score < Self::HIGH_BELOW {
            Self::High
        } else if score < Self::MEDIUM_BELOW {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_display: Option<String>,
    pub impact: Impact,
}

/// A scored audit below the pass line that Lighthouse did not tag as an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    pub id: String,
    pub title: String,
    pub description: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

/// One analysis per (url, strategy) pair.
///
/// Either every report field is populated and `error` is absent, or only
/// `url`/`strategy`/`analyzed_at`/`error` are. The two constructors are the only way to build
/// one in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    url: String,
    strategy: String,
    analyzed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scores: Option<CategoryScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    core_web_vitals: Option<CoreWebVitals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opportunities: Option<Vec<Opportunity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failing_audits: Option<Vec<AuditFinding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    passed_audit_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AnalysisResult {
    pub fn completed(
        url: impl Into<String>,
        strategy: impl Into<String>,
        analyzed_at: DateTime<Utc>,
        scores: CategoryScores,
        core_web_vitals: CoreWebVitals,
        triage: Triage,
    ) -> Self {
        Self {
            url: url.into(),
            strategy: strategy.into(),
            analyzed_at,
            scores: Some(scores),
            core_web_vitals: Some(core_web_vitals),
            opportunities: Some(triage.opportunities),
            failing_audits: Some(triage.failing_audits),
            passed_audit_ids: Some(triage.passed_audit_ids),
            error: None,
        }
    }

    pub fn failed(
        url: impl Into<String>,
        strategy: impl Into<String>,
        analyzed_at: DateTime<Utc>,
        error: impl ToString,
    ) -> Self {
        Self {
            url: url.into(),
            strategy: strategy.into(),
            analyzed_at,
            scores: None,
            core_web_vitals: None,
            opportunities: None,
            failing_audits: None,
            passed_audit_ids: None,
            error: Some(error.to_string()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }

    pub fn scores(&self) -> Option<&CategoryScores> {
        self.scores.as_ref()
    }

    pub fn core_web_vitals(&self) -> Option<&CoreWebVitals> {
        self.core_web_vitals.as_ref()
    }

    pub fn opportunities(&self) -> Option<&[Opportunity]> {
        self.opportunities.as_deref()
    }

    pub fn failing_audits(&self) -> Option<&[AuditFinding]> {
        self.failing_audits.as_deref()
    }

    pub fn passed_audit_ids(&self) -> Option<&[String]> {
        self.passed_audit_ids.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn scale_score_rounds_half_away_from_zero() {
        assert_eq!(scale_score(0.85), 85);
        assert_eq!(scale_score(1.0), 100);
        assert_eq!(scale_score(0.855), 86);
        assert_eq!(scale_score(0.0), 0);
        assert_eq!(scale_score(0.005), 1);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(scale_score(-0.2), 0);
        assert_eq!(scale_score(1.7), 100);
    }

    #[test]
    fn absent_metric_serializes_as_sentinel() {
        let v = serde_json::to_value(MetricValue::absent()).unwrap();
        assert_eq!(v, serde_json::json!({ "value": 0.0, "rating": "" }));
    }

    #[test]
    fn rated_metric_serializes_unit_and_band() {
        let m = MetricValue::rated(2.6, Some("s"), Rating::NeedsImprovement);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "value": 2.6, "unit": "s", "rating": "needs-improvement" })
        );
        let back: MetricValue = serde_json::from_value(v).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn unknown_rating_is_rejected_on_read() {
        let r = serde_json::from_value::<MetricValue>(serde_json::json!({
            "value": 1.0,
            "rating": "excellent"
        }));
        assert!(r.is_err());
    }

    #[test]
    fn failed_result_omits_report_fields() {
        let r = AnalysisResult::failed("https://a.test", "mobile", at(), "boom");
        let v = serde_json::to_value(&r).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 4, "keys={keys:?}");
        for k in ["url", "strategy", "analyzedAt", "error"] {
            assert!(keys.contains(&k), "missing {k}");
        }
        assert_eq!(v["analyzedAt"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn completed_result_uses_camel_case_keys() {
        let r = AnalysisResult::completed(
            "https://a.test",
            "desktop",
            at(),
            CategoryScores {
                performance: 91,
                seo: 100,
                accessibility: 88,
                best_practices: 75,
            },
            CoreWebVitals::default(),
            Triage::default(),
        );
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v["scores"]["bestPractices"], 75);
        assert!(v["coreWebVitals"].get("speedIndex").is_some());
        assert_eq!(v["opportunities"], serde_json::json!([]));
        assert_eq!(v["failingAudits"], serde_json::json!([]));
        assert_eq!(v["passedAuditIds"], serde_json::json!([]));

        let back: AnalysisResult = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
    }

    proptest! {
        #[test]
        fn scaled_scores_stay_in_range(score in 0.0f64..=1.0) {
            let s = scale_score(score);
            prop_assert!(s <= 100);
            prop_assert_eq!(s as f64, (score * 100.0).round());
        }
    }
}
