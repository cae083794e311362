//! Parent labelling for the redirect graph.
//!
//! # Overview
//!
//! A site is a *parent* when it is the canonical end of its redirect chain:
//!
//! - a site with no redirect is trivially a parent;
//! - a site with a redirect walks forward, one hop at a time, remembering
//!   what it visited. If the walk runs off the end of a chain the site is
//!   not a parent (its parent lies further down). If the walk returns to the
//!   site it started from, the site sits on a redirect cycle and is a
//!   parent. If the walk closes a loop elsewhere, the site is a tail leading
//!   into somebody else's cycle and is not a parent.
//!
//! # Design
//!
//! - **Hash-based visited set**: loop detection during a walk is O(1) per hop.
//! - **Shared outcomes**: a walk that closes on its origin has traversed
//!   exactly that cycle, and every node on it would close on itself too.
//!   Outcomes are recorded per node, so later walks stop at the first node
//!   whose outcome is known. The labelling is identical to running every
//!   walk independently.
//! - **Ancestors**: every member of a cycle has the same backward closure,
//!   so it is computed once per terminal component and shared through an
//!   `Arc`; each node hides its own id when the set is read. Labelling and
//!   ancestry together are linear in node count.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use tracing::{debug, instrument};

use super::build::RedirectGraph;

/// Whether a node lies on a redirect cycle, as far as walks have shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Unknown,
    OnCycle,
    OffCycle,
}

/// Label every node's `is_parent` flag and attach ancestry to parents.
///
/// Nodes are processed in construction order. Returns the number of parents.
#[instrument(skip(graph), fields(nodes = graph.node_count()))]
pub fn label_parents(graph: &mut RedirectGraph) -> usize {
    let mut outcome = vec![Walk::Unknown; graph.node_count()];
    let order: Vec<NodeIndex> = graph.node_indices().collect();

    let parents: Vec<NodeIndex> = order
        .into_iter()
        .filter(|&idx| match graph.successor(idx) {
            None => true,
            Some(_) => walk_returns_to_origin(graph, idx, &mut outcome),
        })
        .collect();

    let mut shared: Vec<Option<Arc<BTreeSet<String>>>> = vec![None; graph.node_count()];
    let mut components = 0_usize;
    for &idx in &parents {
        if shared[idx.index()].is_some() {
            continue;
        }
        components += 1;
        let closure = Arc::new(backward_closure(graph, idx));

        // A terminal site is its own component; a cycle is every OnCycle
        // node reached by walking forward until the walk is back at `idx`.
        let mut member = idx;
        loop {
            shared[member.index()] = Some(Arc::clone(&closure));
            match graph.successor(member) {
                Some(next) if next != idx && outcome[next.index()] == Walk::OnCycle => {
                    member = next;
                }
                _ => break,
            }
        }
    }

    for &idx in &parents {
        let node = &mut graph.graph[idx];
        node.is_parent = true;
        node.ancestry = shared[idx.index()].take().filter(|closure| closure.len() > 1);
    }

    debug!(parents = parents.len(), components, "labelled parents");
    parents.len()
}

/// Walk forward from `origin` and report whether the walk closes on it.
fn walk_returns_to_origin(graph: &RedirectGraph, origin: NodeIndex, outcome: &mut [Walk]) -> bool {
    match outcome[origin.index()] {
        Walk::OnCycle => return true,
        Walk::OffCycle => return false,
        Walk::Unknown => {}
    }

    let mut visited: HashSet<NodeIndex> = HashSet::from([origin]);
    let mut path = vec![origin];
    let mut current = origin;

    loop {
        let Some(next) = graph.successor(current) else {
            // Ran off the end of a chain: nothing on this path is cyclic.
            mark(outcome, &path, Walk::OffCycle);
            return false;
        };

        if next == origin {
            mark(outcome, &path, Walk::OnCycle);
            return true;
        }

        if visited.contains(&next) {
            // Loop closed somewhere past the origin: the prefix is a tail.
            let split = path.iter().position(|&n| n == next).unwrap_or(path.len());
            let (tail, cycle) = path.split_at(split);
            mark(outcome, tail, Walk::OffCycle);
            mark(outcome, cycle, Walk::OnCycle);
            return false;
        }

        if outcome[next.index()] != Walk::Unknown {
            // A cycle is marked whole when first closed, so if the origin were
            // on `next`'s cycle it would already be known.
            mark(outcome, &path, Walk::OffCycle);
            return false;
        }

        visited.insert(next);
        path.push(next);
        current = next;
    }
}

fn mark(outcome: &mut [Walk], nodes: &[NodeIndex], value: Walk) {
    for node in nodes {
        outcome[node.index()] = value;
    }
}

/// Every node that reaches `target` by following redirects, `target` included.
fn backward_closure(graph: &RedirectGraph, target: NodeIndex) -> BTreeSet<String> {
    let mut seen: HashSet<NodeIndex> = HashSet::from([target]);
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([target]);
    let mut closure = BTreeSet::from([graph.id(target).to_string()]);

    while let Some(current) = queue.pop_front() {
        for pred in graph.predecessors(current) {
            if seen.insert(pred) {
                closure.insert(graph.id(pred).to_string());
                queue.push_back(pred);
            }
        }
    }

    closure
}
