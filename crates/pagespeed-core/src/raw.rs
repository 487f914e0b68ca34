//! Lenient reader for the PSI v5 `runPagespeed` payload.
//!
//! Only syntactically invalid JSON is an error. Anything parseable but oddly shaped (missing
//! containers, wrong value types, null scores) reads as "absent" so the normalizer can fall
//! back to its sentinel values.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReport {
    /// The nested `lighthouseResult` container.
    pub lighthouse: Option<LighthouseResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LighthouseResult {
    /// Category id -> score. A category present with a null score maps to `None`.
    pub categories: BTreeMap<String, Option<f64>>,
    /// Keyed by audit id; the key is the audit's identity downstream.
    pub audits: BTreeMap<String, RawAudit>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAudit {
    pub title: String,
    pub description: String,
    pub score: Option<f64>,
    pub numeric_value: Option<f64>,
    pub display_value: Option<String>,
    pub details_type: Option<String>,
}

impl RawReport {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let v: Value = serde_json::from_slice(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self::from_value(&v))
    }

    pub fn from_value(v: &Value) -> Self {
        Self {
            lighthouse: v
                .get("lighthouseResult")
                .filter(|l| l.is_object())
                .map(LighthouseResult::from_value),
        }
    }
}

impl LighthouseResult {
    pub fn from_value(v: &Value) -> Self {
        let categories = v
            .get("categories")
            .and_then(|c| c.as_object())
            .map(|m| {
                m.iter()
                    .filter(|(_, c)| c.is_object())
                    .map(|(id, c)| (id.clone(), c.get("score").and_then(|s| s.as_f64())))
                    .collect()
            })
            .unwrap_or_default();

        let audits = v
            .get("audits")
            .and_then(|a| a.as_object())
            .map(|m| {
                m.iter()
                    .filter(|(_, a)| a.is_object())
                    .map(|(id, a)| (id.clone(), RawAudit::from_value(a)))
                    .collect()
            })
            .unwrap_or_default();

        Self { categories, audits }
    }

    /// Score for a category, if the category exists and carries a numeric score.
    pub fn category_score(&self, id: &str) -> Option<f64> {
        self.categories.get(id).copied().flatten()
    }
}

impl RawAudit {
    fn from_value(v: &Value) -> Self {
        let s = |k: &str| v.get(k).and_then(|x| x.as_str()).map(|x| x.to_string());
        Self {
            title: s("title").unwrap_or_default(),
            description: s("description").unwrap_or_default(),
            score: v.get("score").and_then(|x| x.as_f64()),
            numeric_value: v.get("numericValue").and_then(|x| x.as_f64()),
            display_value: s("displayValue").filter(|d| !d.is_empty()),
            details_type: v
                .get("details")
                .and_then(|d| d.get("type"))
                .and_then(|t| t.as_str())
                .map(|t| t.to_string()),
        }
    }

    pub fn is_opportunity(&self) -> bool {
        self.details_type.as_deref() == Some("opportunity")
    }
}
