use crate::domain::model::{DidRecord, Gender, Group, TransitionRecord};

/// `wage_post - wage_pre`; missing if either side is missing or not finite.
pub fn wage_change(wage_pre: Option<f64>, wage_post: Option<f64>) -> Option<f64> {
    match (wage_pre, wage_post) {
        (Some(pre), Some(post)) => Some(post - pre).filter(|d| d.is_finite()),
        _ => None,
    }
}

pub fn derive_outcome(transition: TransitionRecord) -> DidRecord {
    DidRecord {
        dwage: wage_change(transition.wage_pre, transition.wage_post),
        gender: Gender::from_female(transition.female),
        group: Group::from_treated(transition.treated),
        transition,
    }
}

pub fn derive_outcomes(transitions: Vec<TransitionRecord>) -> Vec<DidRecord> {
    let records: Vec<DidRecord> = transitions.into_iter().map(derive_outcome).collect();

    let missing = records.iter().filter(|r| r.dwage.is_none()).count();
    if missing > 0 {
        tracing::warn!(
            "{} of {} transitions have a missing wage change",
            missing,
            records.len()
        );
    }
    records
}
