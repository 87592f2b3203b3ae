// Property-based tests for hidden-index resolution and overlay anchoring.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;

use overgrid_core::{CellAddress, SearchDirection};
use overgrid_engine::index::GridIndex;
use overgrid_engine::CoordinateMapper;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// A hidden mask plus a start index inside it.
fn arb_mask() -> impl Strategy<Value = (Vec<bool>, usize)> {
    proptest::collection::vec(any::<bool>(), 1..40).prop_flat_map(|mask| {
        let len = mask.len();
        (Just(mask), 0..len)
    })
}

fn arb_direction() -> impl Strategy<Value = SearchDirection> {
    prop_oneof![Just(SearchDirection::Backward), Just(SearchDirection::Forward)]
}

proptest! {
    #![proptest_config(config_256())]

    /// The search lands on the closest visible index in its direction, or
    /// reports None exactly when every candidate that way is hidden.
    #[test]
    fn nearest_visible_is_closest((mask, start) in arb_mask(), direction in arb_direction()) {
        let mut index = GridIndex::new(mask.len(), 1);
        index.rows.apply_hidden(mask.clone());

        let candidates: Vec<usize> = match direction {
            SearchDirection::Backward => (0..=start).rev().collect(),
            SearchDirection::Forward => (start..mask.len()).collect(),
        };
        let expected = candidates.into_iter().find(|&i| !mask[i]);

        prop_assert_eq!(index.rows.nearest_visible(start, direction), expected);
    }

    /// Walking forward from each result visits every visible index once,
    /// in order, and stops within N steps.
    #[test]
    fn forward_walk_terminates((mask, start) in arb_mask()) {
        let mut index = GridIndex::new(mask.len(), 1);
        index.rows.apply_hidden(mask.clone());

        let mut at = start;
        let mut seen = Vec::new();
        while let Some(found) = index.rows.nearest_visible(at, SearchDirection::Forward) {
            prop_assert!(found >= at);
            prop_assert!(!mask[found]);
            seen.push(found);
            prop_assert!(seen.len() <= mask.len());
            at = found + 1;
        }
        let expected: Vec<usize> = (start..mask.len()).filter(|&i| !mask[i]).collect();
        prop_assert_eq!(seen, expected);
    }

    /// Out-of-range starts terminate with None.
    #[test]
    fn nearest_visible_out_of_range(len in 0usize..20, extra in 0usize..20, direction in arb_direction()) {
        let index = GridIndex::new(len, 1);
        prop_assert_eq!(index.rows.nearest_visible(len + extra, direction), None);
    }

    /// An anchor is substituted only when its row is hidden and some row
    /// before it is visible; the stand-in is then that previous row.
    #[test]
    fn anchor_substitution_matches_mask((mask, row) in arb_mask()) {
        let mut index = GridIndex::new(mask.len(), 3);
        index.rows.apply_hidden(mask.clone());
        let mapper = CoordinateMapper::new(&index);

        let anchor = mapper.resolve_anchor(CellAddress::new(row, 1));
        let previous_visible = (0..=row).rev().find(|&i| !mask[i]);

        prop_assert_eq!(anchor.row_substituted, mask[row] && previous_visible.is_some());
        prop_assert_eq!(anchor.before_rendered_rows, previous_visible.is_none());
        if let Some(stand_in) = previous_visible {
            prop_assert_eq!(Some(anchor.rendered.row), index.rows.to_rendered(stand_in));
        }
        prop_assert!(!anchor.col_substituted);
    }
}
