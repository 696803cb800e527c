//! Order-preserving deduplication for gaps and retrieved standards.
//!
//! Expansion merges freshly retrieved standards into the existing pool, and
//! re-analysis can reproduce gaps a prior pass already found. First
//! occurrence wins so ranking order is never disturbed.

use scribe_common::types::{Gap, StandardReference};
use std::collections::HashSet;

/// Drop gaps whose (skill domain, description) pair has already been seen.
pub fn dedup_gaps(gaps: Vec<Gap>) -> Vec<Gap> {
    let mut seen = HashSet::new();
    gaps.into_iter()
        .filter(|gap| seen.insert((gap.skill_domain, gap.description.clone())))
        .collect()
}

/// Drop standards whose content has already been seen.
pub fn dedup_standards(standards: Vec<StandardReference>) -> Vec<StandardReference> {
    let mut seen = HashSet::new();
    standards
        .into_iter()
        .filter(|standard| seen.insert(standard.content.clone()))
        .collect()
}
