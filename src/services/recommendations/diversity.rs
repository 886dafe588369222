use std::collections::HashMap;

use crate::models::CandidateEntry;

/// Candidates sharing a primary genre allowed before deferral
pub const DIVERSITY_CAP: usize = 5;

/// Stable sort by score, highest first. Ties keep their incoming order.
pub fn sort_by_score(candidates: &mut [CandidateEntry]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Sorts by score, then defers candidates whose primary genre already has
/// `cap` entries ahead of them.
///
/// Single greedy pass: deferred candidates are appended after every kept
/// one, in their relative score order. Nothing is dropped.
pub fn diversify(mut candidates: Vec<CandidateEntry>, cap: usize) -> Vec<CandidateEntry> {
    sort_by_score(&mut candidates);

    let mut per_genre: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(candidates.len());
    let mut deferred = Vec::new();

    for candidate in candidates {
        let seen = per_genre
            .entry(candidate.title.primary_genre().to_string())
            .or_insert(0);
        if *seen < cap {
            *seen += 1;
            kept.push(candidate);
        } else {
            deferred.push(candidate);
        }
    }

    if !deferred.is_empty() {
        tracing::debug!(
            kept = kept.len(),
            deferred = deferred.len(),
            cap = cap,
            "Diversity re-rank deferred candidates"
        );
    }

    kept.extend(deferred);
    kept
}
