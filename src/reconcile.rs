use std::collections::BTreeSet;

use tracing::warn;

use crate::domain::{Discrepancy, RunId, SampleId};

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Resolved ids the sample sheet does not declare. Purely informational:
    /// a re-queued analysis legitimately produces samples missing from an
    /// older sheet.
    pub fn reconcile(resolved: &BTreeSet<SampleId>, declared: &BTreeSet<SampleId>) -> Discrepancy {
        Discrepancy(resolved.difference(declared).cloned().collect())
    }

    pub fn report(run_id: &RunId, discrepancy: &Discrepancy) {
        if discrepancy.is_empty() {
            return;
        }
        let listing = discrepancy
            .ids()
            .map(SampleId::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            run_id = %run_id,
            extra = discrepancy.0.len(),
            "samples on the mount are not declared in the sample sheet: {listing}"
        );
    }
}
