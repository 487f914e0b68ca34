//! Core Web Vitals rating bands.
//!
//! Thresholds follow Google's published cut points. Every threshold pair is
//! `(good_below, poor_from)`: `< good_below` is good, `< poor_from` needs improvement,
//! anything else is poor.

use crate::model::MetricValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::NeedsImprovement => "needs-improvement",
            Self::Poor => "poor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(Self::Good),
            "needs-improvement" => Some(Self::NeedsImprovement),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricId {
    Fcp,
    Lcp,
    Cls,
    Tbt,
    Ttfb,
    SpeedIndex,
}

impl MetricId {
    pub const ALL: [MetricId; 6] = [
        Self::Fcp,
        Self::Lcp,
        Self::Cls,
        Self::Tbt,
        Self::Ttfb,
        Self::SpeedIndex,
    ];

    /// Lighthouse audit id carrying this metric's `numericValue`.
    pub fn audit_id(self) -> &'static str {
        match self {
            Self::Fcp => "first-contentful-paint",
            Self::Lcp => "largest-contentful-paint",
            Self::Cls => "cumulative-layout-shift",
            Self::Tbt => "total-blocking-time",
            Self::Ttfb => "server-response-time",
            Self::SpeedIndex => "speed-index",
        }
    }

    /// `(good_below, poor_from)`, in seconds for time metrics.
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            Self::Fcp => (1.8, 3.0),
            Self::Lcp => (2.5, 4.0),
            Self::Cls => (0.10, 0.25),
            Self::Tbt => (0.2, 0.6),
            Self::Ttfb => (0.8, 1.8),
            Self::SpeedIndex => (3.4, 5.8),
        }
    }

    /// Time metrics arrive from Lighthouse in milliseconds; CLS is unitless.
    pub fn is_time(self) -> bool {
        !matches!(self, Self::Cls)
    }

    pub fn unit(self) -> Option<&'static str> {
        self.is_time().then_some("s")
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rate an already-converted, already-rounded value.
pub fn classify(id: MetricId, value: f64) -> Rating {
    let (good_below, poor_from) = id.thresholds();
    if value < good_below {
        Rating::Good
    } else if value < poor_from {
        Rating::NeedsImprovement
    } else {
        Rating::Poor
    }
}

/// Build a metric from Lighthouse's raw `numericValue`.
///
/// Rounding happens exactly once, and the rating is computed from the rounded value so the
/// displayed number and its band never disagree.
pub fn metric_from_raw(id: MetricId, raw: f64) -> MetricValue {
    let value = if id.is_time() {
        round2(raw / 1000.0)
    } else {
        round2(raw)
    };
    MetricValue::rated(value, id.unit(), classify(id, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cls_boundaries_are_exclusive_on_the_low_side() {
        let cases = [
            (0.05, Rating::Good),
            (0.15, Rating::NeedsImprovement),
            (0.30, Rating::Poor),
            (0.10, Rating::NeedsImprovement),
            (0.25, Rating::Poor),
        ];
        for (v, want) in cases {
            assert_eq!(classify(MetricId::Cls, v), want, "cls={v}");
        }
    }

    #[test]
    fn lcp_2600ms_needs_improvement() {
        let m = metric_from_raw(MetricId::Lcp, 2600.0);
        assert_eq!(m.value(), 2.6);
        assert_eq!(m.unit(), Some("s"));
        assert_eq!(m.rating(), Some(Rating::NeedsImprovement));
    }

    #[test]
    fn tbt_uses_fractional_second_thresholds() {
        assert_eq!(metric_from_raw(MetricId::Tbt, 150.0).rating(), Some(Rating::Good));
        assert_eq!(
            metric_from_raw(MetricId::Tbt, 200.0).rating(),
            Some(Rating::NeedsImprovement)
        );
        assert_eq!(metric_from_raw(MetricId::Tbt, 600.0).rating(), Some(Rating::Poor));
    }

    #[test]
    fn rating_follows_the_rounded_value() {
        // 2496ms rounds to 2.5s, which is no longer "good" for LCP.
        let m = metric_from_raw(MetricId::Lcp, 2496.0);
        assert_eq!(m.value(), 2.5);
        assert_eq!(m.rating(), Some(Rating::NeedsImprovement));

        // 0.0949 rounds to 0.09 and stays good.
        let m = metric_from_raw(MetricId::Cls, 0.0949);
        assert_eq!(m.value(), 0.09);
        assert_eq!(m.unit(), None);
        assert_eq!(m.rating(), Some(Rating::Good));
    }

    #[test]
    fn every_metric_has_ascending_thresholds() {
        for id in MetricId::ALL {
            let (lo, hi) = id.thresholds();
            assert!(lo < hi, "{id:?}");
            assert_eq!(classify(id, lo - 0.01), Rating::Good);
            assert_eq!(classify(id, lo), Rating::NeedsImprovement);
            assert_eq!(classify(id, hi), Rating::Poor);
        }
    }

    #[test]
    fn rating_strings_round_trip() {
        for r in [Rating::Good, Rating::NeedsImprovement, Rating::Poor] {
            assert_eq!(Rating::parse(r.as_str()), Some(r));
        }
        assert_eq!(Rating::parse(""), None);
    }

    proptest! {
        #[test]
        fn lowering_a_value_never_worsens_its_rating(
            idx in 0usize..6,
            a in 0.0f64..120_000.0,
            b in 0.0f64..120_000.0,
        ) {
            let id = MetricId::ALL[idx];
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let r_lo = metric_from_raw(id, lo).rating().unwrap();
            let r_hi = metric_from_raw(id, hi).rating().unwrap();
            prop_assert!(r_lo <= r_hi, "{id:?}: {lo} -> {r_lo:?}, {hi} -> {r_hi:?}");
        }

        #[test]
        fn rating_is_a_function_of_the_displayed_value(idx in 0usize..6, raw in 0.0f64..120_000.0) {
            let id = MetricId::ALL[idx];
            let m = metric_from_raw(id, raw);
            prop_assert_eq!(m.rating(), Some(classify(id, m.value())));
        }
    }
}
