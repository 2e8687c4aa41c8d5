//! Reference resolution inside one fragment.
//!
//! Child references stay names on the wire. Resolution builds an arena
//! (`op_name` → declaration position) and the child/parent edges between
//! positions, then checks that the edges form a DAG with exactly one sink.
//! Nothing here looks outside the fragment: only shuffle ids cross fragment
//! boundaries, and those are handled by `shuffle`.

use std::collections::{BTreeSet, HashMap};

use fragplan_core::diagnostic::{ErrorKind, PlanError};
use fragplan_core::id::{FragmentId, OpIndex};
use fragplan_core::plan::Fragment;

/// Resolved view of one fragment. Positions index into `Fragment::operators`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFragment {
    fragment: FragmentId,
    names: HashMap<String, OpIndex>,
    children: Vec<Vec<OpIndex>>,
    parents: Vec<Vec<OpIndex>>,
    sink: OpIndex,
    topo: Vec<OpIndex>,
}

impl ResolvedFragment {
    pub fn fragment(&self) -> FragmentId {
        self.fragment
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<OpIndex> {
        self.names.get(name).copied()
    }

    /// Resolved inputs of `op`, in `arg_child1`, `arg_child2` order.
    pub fn children(&self, op: OpIndex) -> &[OpIndex] {
        &self.children[op.get()]
    }

    /// In-fragment consumers of `op`.
    pub fn parents(&self, op: OpIndex) -> &[OpIndex] {
        &self.parents[op.get()]
    }

    /// The single operator with no in-fragment consumer.
    pub fn sink(&self) -> OpIndex {
        self.sink
    }

    /// Every operator, inputs before the operators that read them.
    pub fn topo_order(&self) -> &[OpIndex] {
        &self.topo
    }
}

/// Resolve `fragment` (at plan position `index`) or return every structural
/// problem found in it.
pub fn resolve_fragment(
    index: usize,
    fragment: &Fragment,
) -> Result<ResolvedFragment, Vec<PlanError>> {
    let ops = &fragment.operators;
    // Keyed by the declaration position of the first operator involved.
    let mut errors: Vec<(usize, PlanError)> = Vec::new();
    let err = |kind: ErrorKind| PlanError::new(kind).in_fragment(index);

    // Arena. The first declaration of a name wins; later ones are reported.
    let mut names: HashMap<String, OpIndex> = HashMap::with_capacity(ops.len());
    let mut duplicated: Vec<&str> = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        let name = op.op_name();
        if names.contains_key(name) {
            if !duplicated.contains(&name) {
                duplicated.push(name);
            }
        } else {
            names.insert(name.to_string(), OpIndex::new(i));
        }
    }
    for name in &duplicated {
        let first = names.get(*name).map_or(0, |i| i.get());
        errors.push((
            first,
            err(ErrorKind::DuplicateOperatorName {
                name: name.to_string(),
            })
            .at(*name),
        ));
    }

    // Edges.
    let mut children: Vec<Vec<OpIndex>> = vec![Vec::new(); ops.len()];
    let mut parents: Vec<Vec<OpIndex>> = vec![Vec::new(); ops.len()];
    for (i, op) in ops.iter().enumerate() {
        for child in op.children() {
            match names.get(child) {
                Some(&c) => {
                    children[i].push(c);
                    if !parents[c.get()].contains(&OpIndex::new(i)) {
                        parents[c.get()].push(OpIndex::new(i));
                    }
                }
                None => errors.push((
                    i,
                    err(ErrorKind::UnresolvedChildReference {
                        child: child.to_string(),
                    })
                    .at(op.op_name()),
                )),
            }
        }
    }

    let cycles = find_cycles(&children);
    for cycle in &cycles {
        let members: Vec<String> = cycle
            .iter()
            .map(|i| ops[i.get()].op_name().to_string())
            .collect();
        let mut labels = members.clone();
        labels.push(members[0].clone());
        errors.push((
            cycle[0].get(),
            err(ErrorKind::CyclicReference { cycle: labels }).at_all(members),
        ));
    }

    // The sink count is meaningless on a cyclic graph or with shadowed names.
    let mut sink = None;
    if cycles.is_empty() && duplicated.is_empty() {
        let terminals: Vec<usize> = (0..ops.len()).filter(|&i| parents[i].is_empty()).collect();
        if terminals.len() == 1 {
            sink = Some(OpIndex::new(terminals[0]));
        } else {
            errors.push((
                terminals.first().copied().unwrap_or(0),
                err(ErrorKind::MultipleOrNoTerminalOperator {
                    count: terminals.len(),
                })
                .at_all(terminals.iter().map(|&i| ops[i].op_name())),
            ));
        }
    }

    match sink {
        Some(sink) if errors.is_empty() => {
            let topo = topo_from_sink(sink, &children);
            Ok(ResolvedFragment {
                fragment: FragmentId::new(index),
                names,
                children,
                parents,
                sink,
                topo,
            })
        }
        _ => {
            errors.sort_by_key(|(at, _)| *at);
            Err(errors.into_iter().map(|(_, e)| e).collect())
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Every distinct cycle reachable along child edges, each rotated to start at
/// its smallest position so it is reported once.
///
/// Iterative: a frame is (node, next child to look at), and the frame stack
/// is the current path.
fn find_cycles(children: &[Vec<OpIndex>]) -> Vec<Vec<OpIndex>> {
    let mut marks = vec![Mark::Unvisited; children.len()];
    let mut found: BTreeSet<Vec<usize>> = BTreeSet::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..children.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::OnPath;
        stack.push((start, 0));

        while let Some(&(node, next)) = stack.last() {
            let Some(child) = children[node].get(next) else {
                stack.pop();
                marks[node] = Mark::Done;
                continue;
            };
            let top = stack.len() - 1;
            stack[top].1 += 1;

            let c = child.get();
            match marks[c] {
                Mark::Unvisited => {
                    marks[c] = Mark::OnPath;
                    stack.push((c, 0));
                }
                Mark::OnPath => {
                    let from = stack.iter().rposition(|&(n, _)| n == c).unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[from..].iter().map(|&(n, _)| n).collect();
                    let min_at = cycle
                        .iter()
                        .enumerate()
                        .min_by_key(|&(_, n)| *n)
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    cycle.rotate_left(min_at);
                    found.insert(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    found
        .into_iter()
        .map(|c| c.into_iter().map(OpIndex::new).collect())
        .collect()
}

/// Post-order walk from the sink: inputs first, `arg_child1` before `arg_child2`.
fn topo_from_sink(sink: OpIndex, children: &[Vec<OpIndex>]) -> Vec<OpIndex> {
    let mut seen = vec![false; children.len()];
    let mut out = Vec::with_capacity(children.len());
    let mut stack: Vec<(OpIndex, usize)> = vec![(sink, 0)];
    seen[sink.get()] = true;

    while let Some(&(node, next)) = stack.last() {
        match children[node.get()].get(next) {
            Some(&c) => {
                let top = stack.len() - 1;
                stack[top].1 += 1;
                if !seen[c.get()] {
                    seen[c.get()] = true;
                    stack.push((c, 0));
                }
            }
            None => {
                stack.pop();
                out.push(node);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragplan_core::operator::{Operator, PartitionFunction};
    use fragplan_core::relation::RelationKey;

    fn key(rel: &str) -> RelationKey {
        RelationKey::new("jwang", "global_join", rel)
    }

    fn codes(errs: &[PlanError]) -> Vec<&'static str> {
        errs.iter().map(|e| e.kind.code()).collect()
    }

    fn insert(name: &str, child: &str) -> Operator {
        Operator::insert(name, child, key("out"), true)
    }

    #[test]
    fn scan_then_insert_resolves() {
        let frag = Fragment::new(vec![
            Operator::scan("Scan", key("smallTable")),
            insert("Insert", "Scan"),
        ]);
        let r = resolve_fragment(0, &frag).unwrap();
        assert_eq!(r.sink(), OpIndex::new(1));
        assert_eq!(r.topo_order(), &[OpIndex::new(0), OpIndex::new(1)]);
        assert_eq!(r.children(OpIndex::new(1)), &[OpIndex::new(0)]);
        assert_eq!(r.parents(OpIndex::new(0)), &[OpIndex::new(1)]);
        assert_eq!(r.index_of("Scan"), Some(OpIndex::new(0)));
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let frag = Fragment::new(vec![insert("Insert", "Scan"), Operator::scan("Scan", key("t"))]);
        let r = resolve_fragment(0, &frag).unwrap();
        assert_eq!(r.sink(), OpIndex::new(0));
        assert_eq!(r.topo_order(), &[OpIndex::new(1), OpIndex::new(0)]);
    }

    #[test]
    fn duplicate_names() {
        let frag = Fragment::new(vec![
            Operator::scan("Scan", key("a")),
            Operator::scan("Scan", key("b")),
            Operator::scan("Scan", key("c")),
            insert("Insert", "Scan"),
        ]);
        let errs = resolve_fragment(2, &frag).unwrap_err();
        assert_eq!(codes(&errs), vec!["DuplicateOperatorName"]);
        assert_eq!(errs[0].fragment, Some(2));
        assert_eq!(errs[0].operators, vec!["Scan".to_string()]);
    }

    #[test]
    fn unresolved_reference() {
        let frag = Fragment::new(vec![insert("Insert", "Gather")]);
        let errs = resolve_fragment(0, &frag).unwrap_err();
        assert_eq!(codes(&errs), vec!["UnresolvedChildReference"]);
        assert_eq!(errs[0].operators, vec!["Insert".to_string()]);
    }

    #[test]
    fn two_node_cycle() {
        let frag = Fragment::new(vec![
            Operator::shuffle_producer("A", "B", "h", PartitionFunction::RoundRobin),
            Operator::shuffle_producer("B", "A", "h", PartitionFunction::RoundRobin),
        ]);
        let errs = resolve_fragment(0, &frag).unwrap_err();
        assert_eq!(codes(&errs), vec!["CyclicReference"]);
        match &errs[0].kind {
            ErrorKind::CyclicReference { cycle } => assert_eq!(cycle, &["A", "B", "A"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn self_loop_reported_once() {
        let frag = Fragment::new(vec![
            Operator::scan("Scan", key("t")),
            Operator::local_join("J", "J", "Scan", vec![0], vec![0], vec![0], vec![0]),
            insert("Insert", "J"),
        ]);
        let errs = resolve_fragment(0, &frag).unwrap_err();
        assert_eq!(codes(&errs), vec!["CyclicReference"]);
    }

    #[test]
    fn two_sinks() {
        let frag = Fragment::new(vec![
            Operator::scan("Scan", key("t")),
            insert("Insert1", "Scan"),
            insert("Insert2", "Scan"),
        ]);
        let errs = resolve_fragment(0, &frag).unwrap_err();
        assert_eq!(
            errs[0].kind,
            ErrorKind::MultipleOrNoTerminalOperator { count: 2 }
        );
        assert_eq!(errs[0].operators, vec!["Insert1", "Insert2"]);
    }

    #[test]
    fn empty_fragment_has_no_sink() {
        let errs = resolve_fragment(0, &Fragment::new(vec![])).unwrap_err();
        assert_eq!(
            errs[0].kind,
            ErrorKind::MultipleOrNoTerminalOperator { count: 0 }
        );
    }

    #[test]
    fn long_chain_resolves_without_recursion() {
        const N: usize = 100_000;
        let mut ops = Vec::with_capacity(N + 1);
        ops.push(Operator::scan("Op0", key("t")));
        for i in 1..=N {
            ops.push(insert(&format!("Op{i}"), &format!("Op{}", i - 1)));
        }
        let r = resolve_fragment(0, &Fragment::new(ops)).unwrap();
        assert_eq!(r.sink(), OpIndex::new(N));
        assert_eq!(r.topo_order().len(), N + 1);
        assert_eq!(r.topo_order()[0], OpIndex::new(0));
        assert_eq!(r.topo_order()[N], OpIndex::new(N));
    }

    #[test]
    fn long_cycle_is_found() {
        const N: usize = 100_000;
        let ops = (0..N)
            .map(|i| insert(&format!("Op{i}"), &format!("Op{}", (i + 1) % N)))
            .collect();
        let errs = resolve_fragment(0, &Fragment::new(ops)).unwrap_err();
        assert_eq!(codes(&errs), vec!["CyclicReference"]);
        match &errs[0].kind {
            ErrorKind::CyclicReference { cycle } => {
                assert_eq!(cycle.len(), N + 1);
                assert_eq!(cycle[0], "Op0");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn errors_follow_declaration_order() {
        let frag = Fragment::new(vec![
            insert("Insert", "Missing"),
            Operator::scan("Scan", key("a")),
            Operator::scan("Scan", key("b")),
            insert("Insert2", "Scan"),
        ]);
        let errs = resolve_fragment(0, &frag).unwrap_err();
        assert_eq!(codes(&errs), vec!["UnresolvedChildReference", "DuplicateOperatorName"]);
    }

    #[test]
    fn diamond_is_a_dag() {
        let frag = Fragment::new(vec![
            Operator::scan("Scan", key("t")),
            Operator::local_join("Self", "Scan", "Scan", vec![0], vec![1], vec![0], vec![1]),
            insert("Insert", "Self"),
        ]);
        let r = resolve_fragment(0, &frag).unwrap();
        assert_eq!(r.children(OpIndex::new(1)), &[OpIndex::new(0), OpIndex::new(0)]);
        assert_eq!(r.parents(OpIndex::new(0)), &[OpIndex::new(1)]);
        assert_eq!(r.topo_order().len(), 3);
    }
}
