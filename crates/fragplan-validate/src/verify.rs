//! Debug-time verification helpers for resolved fragments.
//!
//! These re-check invariants the resolver is supposed to establish. They are
//! called from `validate_plan` in debug builds and from tests. They should be cheap.

use std::collections::HashSet;

use fragplan_core::id::OpIndex;

use crate::resolve::ResolvedFragment;

/// Verify that every operator appears after all of its children in `topo_order`.
pub fn assert_topological(r: &ResolvedFragment) {
    let mut seen = HashSet::<OpIndex>::new();
    for &op in r.topo_order() {
        for c in r.children(op) {
            assert!(
                seen.contains(c),
                "child {c} not ordered before {op} in {}",
                r.fragment()
            );
        }
        seen.insert(op);
    }
    assert_eq!(
        seen.len(),
        r.len(),
        "{}: topological order covers {} of {} operators",
        r.fragment(),
        seen.len(),
        r.len()
    );
}

/// Verify that the recorded sink is the only operator without parents and
/// that it closes the topological order.
pub fn assert_single_sink(r: &ResolvedFragment) {
    let terminals: Vec<OpIndex> = (0..r.len())
        .map(OpIndex::new)
        .filter(|&i| r.parents(i).is_empty())
        .collect();
    assert_eq!(terminals, vec![r.sink()], "{}: terminal operators", r.fragment());
    assert_eq!(r.topo_order().last(), Some(&r.sink()), "{}: sink not last", r.fragment());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_fragment;
    use fragplan_core::operator::Operator;
    use fragplan_core::plan::Fragment;
    use fragplan_core::relation::RelationKey;

    #[test]
    fn resolver_output_passes() {
        let key = RelationKey::new("u", "p", "t");
        let frag = Fragment::new(vec![
            Operator::insert("Insert", "Join", key.clone(), true),
            Operator::local_join("Join", "A", "B", vec![0], vec![0], vec![0], vec![0]),
            Operator::scan("A", key.clone()),
            Operator::scan("B", key),
        ]);
        let r = resolve_fragment(0, &frag).unwrap();
        assert_topological(&r);
        assert_single_sink(&r);
    }
}
