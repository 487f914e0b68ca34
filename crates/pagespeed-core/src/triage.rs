//! Sorting scored audits into passed / opportunity / failing buckets.

use crate::model::{AuditFinding, Impact, Opportunity};
use crate::raw::RawAudit;

/// Audits scoring at or above this pass.
pub const PASS_SCORE: f64 = 0.90;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triage {
    pub opportunities: Vec<Opportunity>,
    pub failing_audits: Vec<AuditFinding>,
    pub passed_audit_ids: Vec<String>,
}

impl Triage {
    pub fn len(&self) -> usize {
        self.opportunities.len() + self.failing_audits.len() + self.passed_audit_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single pass over `(audit id, audit)` pairs; output order follows input order.
///
/// Unscored audits (informative / manual / not applicable) land in no bucket.
pub fn triage<'a, I>(audits: I) -> Triage
where
    I: IntoIterator<Item = (&'a String, &'a RawAudit)>,
{
    let mut out = Triage::default();
    for (id, a) in audits {
        let Some(score) = a.score else { continue };

        if score >= PASS_SCORE {
            out.passed_audit_ids.push(id.clone());
        } else if a.is_opportunity() {
            out.opportunities.push(Opportunity {
                id: id.clone(),
                title: a.title.clone(),
                description: a.description.clone(),
                savings_display: a.display_value.clone(),
                impact: Impact::from_score(score),
            });
        } else {
            out.failing_audits.push(AuditFinding {
                id: id.clone(),
                title: a.title.clone(),
                description: a.description.clone(),
                score,
                display_value: a.display_value.clone(),
            });
        }
    }
    out
}
