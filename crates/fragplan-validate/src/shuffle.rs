//! Plan-wide pairing of shuffle producers and consumers.
//!
//! Producers and consumers are not connected by child edges; they share an
//! `arg_operator_id`. Pairing is a grouped lookup over that id: one logical
//! repartition has exactly one producer, fans out to any number of consumers,
//! and always crosses a fragment boundary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use fragplan_core::diagnostic::{ErrorKind, PlanError, ShuffleSide};
use fragplan_core::id::{FragmentId, OpRef};
use fragplan_core::operator::Operator;
use fragplan_core::plan::Plan;

/// A correctly paired shuffle id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleRoute {
    pub id: String,
    pub producer: OpRef,
    /// Declaration order across the plan.
    pub consumers: Vec<OpRef>,
}

impl ShuffleRoute {
    pub fn consumer_fragments(&self) -> BTreeSet<FragmentId> {
        self.consumers.iter().map(|c| c.fragment).collect()
    }

    /// Point-to-point channels a scheduler must open: every producer instance
    /// talks to every consumer instance. `None` when a fragment involved has no
    /// explicit worker list.
    pub fn channel_count(&self, plan: &Plan) -> Option<usize> {
        let instances = |f: FragmentId| {
            plan.fragments
                .get(f.get())
                .and_then(|frag| frag.instance_count())
        };
        let senders = instances(self.producer.fragment)?;
        let mut receivers = 0;
        for f in self.consumer_fragments() {
            receivers += instances(f)?;
        }
        Some(senders * receivers)
    }
}

/// Routes keyed by shuffle id, in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleMap {
    routes: BTreeMap<String, ShuffleRoute>,
}

impl ShuffleMap {
    pub fn get(&self, id: &str) -> Option<&ShuffleRoute> {
        self.routes.get(id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShuffleRoute> {
        self.routes.values()
    }

    /// Route whose consumers include `consumer`.
    pub fn route_of_consumer(&self, consumer: OpRef) -> Option<&ShuffleRoute> {
        self.routes
            .values()
            .find(|r| r.consumers.contains(&consumer))
    }
}

#[derive(Default)]
struct Group {
    producers: Vec<OpRef>,
    consumers: Vec<OpRef>,
}

/// Pair every shuffle id in `plan`. Returns the well-formed routes plus every
/// pairing problem; ids with problems get no route. Problems are ordered by
/// the first operator they name, in plan order.
pub fn check_shuffles(plan: &Plan) -> (ShuffleMap, Vec<PlanError>) {
    let mut groups: BTreeMap<&str, Group> = BTreeMap::new();
    for (at, op) in plan.operators() {
        match op {
            Operator::ShuffleProducer {
                arg_operator_id, ..
            } => groups
                .entry(arg_operator_id.as_str())
                .or_default()
                .producers
                .push(at),
            Operator::ShuffleConsumer {
                arg_operator_id, ..
            } => groups
                .entry(arg_operator_id.as_str())
                .or_default()
                .consumers
                .push(at),
            _ => {}
        }
    }

    let name = |at: &OpRef| {
        plan.operator(*at)
            .map(|op| op.op_name().to_string())
            .unwrap_or_default()
    };

    let mut map = ShuffleMap::default();
    let mut errors: Vec<(OpRef, PlanError)> = Vec::new();
    for (id, g) in groups {
        let mut ok = true;

        if g.producers.len() > 1 {
            ok = false;
            errors.push((
                g.producers[0],
                PlanError::new(ErrorKind::DuplicateProducerForId {
                    id: id.to_string(),
                    count: g.producers.len(),
                })
                .at_all(g.producers.iter().map(name)),
            ));
        }

        let missing = match (g.producers.is_empty(), g.consumers.is_empty()) {
            (true, _) => Some((ShuffleSide::Producer, &g.consumers)),
            (false, true) => Some((ShuffleSide::Consumer, &g.producers)),
            (false, false) => None,
        };
        if let Some((side, present)) = missing {
            ok = false;
            let mut e = PlanError::new(ErrorKind::UnmatchedShuffleId {
                id: id.to_string(),
                missing: side,
            })
            .at_all(present.iter().map(name));
            // Tag the fragment only when every present side lives in one.
            let mut frags = present.iter().map(|p| p.fragment);
            if let Some(first) = frags.next() {
                if frags.all(|f| f == first) {
                    e = e.in_fragment(first.get());
                }
            }
            if let Some(&first) = present.first() {
                errors.push((first, e));
            }
        }

        for p in &g.producers {
            for c in g.consumers.iter().filter(|c| c.fragment == p.fragment) {
                ok = false;
                errors.push((
                    (*p).min(*c),
                    PlanError::new(ErrorKind::ShuffleSameFragment { id: id.to_string() })
                        .in_fragment(p.fragment.get())
                        .at(name(p))
                        .at(name(c)),
                ));
            }
        }

        if ok {
            map.routes.insert(
                id.to_string(),
                ShuffleRoute {
                    id: id.to_string(),
                    producer: g.producers[0],
                    consumers: g.consumers,
                },
            );
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(routes = map.len(), errors = errors.len(), "shuffle pairing");

    errors.sort_by_key(|(at, _)| *at);
    (map, errors.into_iter().map(|(_, e)| e).collect())
}
