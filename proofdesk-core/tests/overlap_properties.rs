use pretty_assertions::assert_eq;
use proofdesk_core::overlap::remove_overlaps;
use proofdesk_core::{MatchStrategy, ResolvedPosition};
use proptest::prelude::*;

fn pos(id: &str, start: usize, end: usize, strategy: MatchStrategy) -> ResolvedPosition {
    ResolvedPosition { issue_id: id.to_owned(), start, end, strategy }
}

#[test]
fn identical_ranges_keep_exactly_one() {
    let outcome = remove_overlaps(&[
        pos("b", 5, 10, MatchStrategy::Primary),
        pos("a", 5, 10, MatchStrategy::Primary),
    ]);
    assert_eq!(outcome.kept, vec![pos("a", 5, 10, MatchStrategy::Primary)]);
    assert_eq!(outcome.hidden, vec!["b".to_owned()]);
}

#[test]
fn primary_match_wins_over_earlier_fallback() {
    let outcome = remove_overlaps(&[
        pos("fallback", 2, 8, MatchStrategy::Fallback),
        pos("primary", 6, 12, MatchStrategy::Primary),
    ]);
    assert_eq!(outcome.kept, vec![pos("primary", 6, 12, MatchStrategy::Primary)]);
    assert_eq!(outcome.hidden, vec!["fallback".to_owned()]);
}

#[test]
fn adjacent_ranges_both_survive() {
    let outcome = remove_overlaps(&[
        pos("a", 0, 4, MatchStrategy::Primary),
        pos("b", 4, 9, MatchStrategy::Primary),
    ]);
    assert_eq!(outcome.kept.len(), 2);
    assert!(outcome.hidden.is_empty());
}

#[test]
fn shared_start_conflicts_even_when_zero_width() {
    let outcome = remove_overlaps(&[
        pos("b-range", 3, 7, MatchStrategy::Primary),
        pos("a-insert", 3, 3, MatchStrategy::Primary),
        pos("c-insert", 7, 7, MatchStrategy::Primary),
    ]);
    let kept: Vec<&str> = outcome.kept.iter().map(|p| p.issue_id.as_str()).collect();
    assert_eq!(kept, vec!["a-insert", "c-insert"]);
    assert_eq!(outcome.hidden, vec!["b-range".to_owned()]);
}

#[test]
fn empty_input_yields_empty_outcome() {
    let outcome = remove_overlaps(&[]);
    assert!(outcome.kept.is_empty());
    assert!(outcome.hidden.is_empty());
}

fn position_strategy() -> impl Strategy<Value = (usize, usize, bool)> {
    (0usize..60, 0usize..12, any::<bool>())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, failure_persistence: None, ..ProptestConfig::default() })]

    #[test]
    fn kept_positions_are_sorted_and_disjoint(raw in proptest::collection::vec(position_strategy(), 0..40)) {
        let input: Vec<ResolvedPosition> = raw
            .iter()
            .enumerate()
            .map(|(i, (start, len, primary))| {
                let strategy = if *primary { MatchStrategy::Primary } else { MatchStrategy::Fallback };
                pos(&format!("issue-{i:02}"), *start, start + len, strategy)
            })
            .collect();
        let outcome = remove_overlaps(&input);

        for pair in outcome.kept.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
            prop_assert!(pair[0].end <= pair[1].start);
        }
        prop_assert_eq!(outcome.kept.len() + outcome.hidden.len(), input.len());
    }

    #[test]
    fn every_hidden_position_conflicts_with_a_kept_one(raw in proptest::collection::vec(position_strategy(), 0..40)) {
        let input: Vec<ResolvedPosition> = raw
            .iter()
            .enumerate()
            .map(|(i, (start, len, _))| pos(&format!("issue-{i:02}"), *start, start + len, MatchStrategy::Primary))
            .collect();
        let outcome = remove_overlaps(&input);

        for id in &outcome.hidden {
            let hidden = input.iter().find(|p| &p.issue_id == id).unwrap();
            prop_assert!(outcome.kept.iter().any(|k| k.conflicts_with(hidden)));
        }
    }

    #[test]
    fn removal_is_order_independent(raw in proptest::collection::vec(position_strategy(), 0..30)) {
        let input: Vec<ResolvedPosition> = raw
            .iter()
            .enumerate()
            .map(|(i, (start, len, primary))| {
                let strategy = if *primary { MatchStrategy::Primary } else { MatchStrategy::Fallback };
                pos(&format!("issue-{i:02}"), *start, start + len, strategy)
            })
            .collect();
        let mut reversed = input.clone();
        reversed.reverse();
        prop_assert_eq!(remove_overlaps(&input), remove_overlaps(&reversed));
    }
}
