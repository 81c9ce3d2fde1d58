//! Overlap Resolver: keeps a maximal conflict-free subset of positions.
//!
//! Candidates are admitted greedily in priority order (primary before
//! fallback, then earlier start, then smaller issue id) into an ordered map
//! keyed by start. Because admitted ranges never conflict, only the nearest
//! neighbour on each side of a candidate needs checking.

use std::collections::BTreeMap;

use crate::position::ResolvedPosition;

/// Result of overlap removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapOutcome {
    /// Surfaced positions, strictly increasing in `start`, pairwise disjoint.
    pub kept: Vec<ResolvedPosition>,
    /// Ids whose positions lost a conflict, sorted.
    pub hidden: Vec<String>,
}

pub fn remove_overlaps(positions: &[ResolvedPosition]) -> OverlapOutcome {
    let mut ranked: Vec<&ResolvedPosition> = positions.iter().collect();
    ranked.sort_by(|a, b| {
        a.strategy
            .cmp(&b.strategy)
            .then(a.start.cmp(&b.start))
            .then_with(|| a.issue_id.cmp(&b.issue_id))
    });

    let mut admitted: BTreeMap<usize, &ResolvedPosition> = BTreeMap::new();
    let mut hidden = Vec::new();

    for candidate in ranked {
        let before = admitted.range(..=candidate.start).next_back().map(|(_, p)| *p);
        let after = admitted.range(candidate.start + 1..).next().map(|(_, p)| *p);
        let blocked = [before, after]
            .into_iter()
            .flatten()
            .any(|neighbour| neighbour.conflicts_with(candidate));
        if blocked {
            hidden.push(candidate.issue_id.clone());
        } else {
            admitted.insert(candidate.start, candidate);
        }
    }

    hidden.sort();
    OverlapOutcome { kept: admitted.into_values().cloned().collect(), hidden }
}
