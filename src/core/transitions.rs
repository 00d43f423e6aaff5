//! Panel-to-pairs transformation.
//!
//! Rows are grouped by person and ordered by wave. Every adjacent pair of waves
//! where the person was non-union at the earlier wave becomes one
//! [`TransitionRecord`]; `treated` is the union status at the later wave.

use crate::domain::model::{PanelRecord, PersonId, TransitionRecord};
use std::collections::BTreeMap;

/// Groups rows by person, each group sorted by wave (stable, so duplicate waves keep input order).
pub fn group_by_person(records: &[PanelRecord]) -> BTreeMap<&PersonId, Vec<&PanelRecord>> {
    let mut persons: BTreeMap<&PersonId, Vec<&PanelRecord>> = BTreeMap::new();
    for record in records {
        persons.entry(&record.person_id).or_default().push(record);
    }
    for waves in persons.values_mut() {
        waves.sort_by_key(|r| r.wave);
    }
    persons
}

/// Extracts every eligible (pre, post) transition, ordered by person then wave.
pub fn extract_transitions(records: &[PanelRecord], female_code: &str) -> Vec<TransitionRecord> {
    let persons = group_by_person(records);
    let mut transitions = Vec::new();

    for (person_id, waves) in &persons {
        if waves.windows(2).any(|w| w[0].wave == w[1].wave) {
            tracing::warn!(
                "Person {} has duplicate waves; pairing them in input order",
                person_id
            );
        }

        for pair in waves.windows(2) {
            let (pre, post) = (pair[0], pair[1]);
            if !pre.is_non_union() {
                continue;
            }

            // Gender comes from the post row even though it should not vary by wave.
            transitions.push(TransitionRecord {
                person_id: (*person_id).clone(),
                wave_pre: pre.wave,
                wave_post: post.wave,
                female: post.is_female(female_code),
                treated: post.is_union(),
                wage_pre: pre.wage,
                wage_post: post.wage,
            });
        }
    }

    tracing::debug!(
        "Extracted {} transitions from {} persons ({} rows)",
        transitions.len(),
        persons.len(),
        records.len()
    );
    transitions
}
