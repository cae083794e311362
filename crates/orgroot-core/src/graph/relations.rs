//! Nearest-parent and related-parent index.
//!
//! # Overview
//!
//! After [`label_parents`](super::parents::label_parents), every site gets two
//! relations:
//!
//! - **nearest parent**: follow redirects forward until a parent is reached
//!   (a parent is its own nearest parent);
//! - **related parents**: the parents among the site itself plus the sites
//!   related to it by traversal. With [`RelationDirection::Descendants`] those
//!   are the sites whose redirect chain passes through it; with
//!   [`RelationDirection::Successors`] they are the sites its own chain passes
//!   through. The site itself comes first when it is a parent, the rest
//!   follow in construction order.
//!
//! # Design
//!
//! Every redirect chain ends in a *terminal component*: a strongly connected
//! component with no edge leaving it, which is either a single site without a
//! redirect or a redirect cycle. Labelling makes exactly the members of
//! terminal components parents. Related parents therefore only depend on
//! which terminal component a site belongs to (descendants) or drains into
//! (successors). The index computes components once with petgraph's
//! Kosaraju implementation and answers every node from them, so no
//! traversal is repeated per node.
//!
//! [`nearest_parent`] and [`related_parents_by_traversal`] answer a single
//! node by walking the graph directly. They serve as a reference for the
//! index in tests and simulation.

use std::collections::{HashSet, VecDeque};

use petgraph::{Direction, algo::kosaraju_scc, graph::NodeIndex};
use tracing::{debug, instrument};

use super::build::RedirectGraph;
use crate::config::RelationDirection;
use crate::error::ResolveError;

// ---------------------------------------------------------------------------
// RelationIndex
// ---------------------------------------------------------------------------

/// Per-node nearest parent and related parents.
#[derive(Debug, Clone)]
pub struct RelationIndex {
    direction: RelationDirection,
    nearest: Vec<NodeIndex>,
    is_parent: Vec<bool>,
    /// Terminal component whose parents relate to each node, if any.
    related_component: Vec<Option<usize>>,
    /// Parents of each component in construction order (empty if not terminal).
    component_parents: Vec<Vec<NodeIndex>>,
}

impl RelationIndex {
    /// Build the index for a labelled graph.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ResolutionIncomplete`] if some node's forward
    /// walk does not reach a parent within `node_count` hops, which means
    /// the graph was not labelled by
    /// [`label_parents`](super::parents::label_parents).
    #[instrument(skip(graph), fields(nodes = graph.node_count()))]
    pub fn build(graph: &RedirectGraph, direction: RelationDirection) -> Result<Self, ResolveError> {
        let nearest = resolve_nearest(graph)?;
        let is_parent: Vec<bool> = graph
            .node_indices()
            .map(|idx| graph.node(idx).is_parent)
            .collect();

        let components = kosaraju_scc(&graph.graph);
        let mut component_of = vec![0_usize; graph.node_count()];
        for (c, members) in components.iter().enumerate() {
            for member in members {
                component_of[member.index()] = c;
            }
        }

        let component_parents: Vec<Vec<NodeIndex>> = components
            .iter()
            .enumerate()
            .map(|(c, members)| {
                let terminal = members.iter().all(|&m| {
                    graph
                        .successor(m)
                        .is_none_or(|next| component_of[next.index()] == c)
                });
                if !terminal {
                    return Vec::new();
                }
                let mut parents: Vec<NodeIndex> = members
                    .iter()
                    .copied()
                    .filter(|m| is_parent[m.index()])
                    .collect();
                parents.sort_unstable();
                parents
            })
            .collect();

        let related_component: Vec<Option<usize>> = graph
            .node_indices()
            .map(|idx| {
                let anchor = match direction {
                    RelationDirection::Descendants => idx,
                    RelationDirection::Successors => nearest[idx.index()],
                };
                let c = component_of[anchor.index()];
                (!component_parents[c].is_empty()).then_some(c)
            })
            .collect();

        debug!(
            components = components.len(),
            terminal = component_parents.iter().filter(|p| !p.is_empty()).count(),
            "indexed relations"
        );

        Ok(Self {
            direction,
            nearest,
            is_parent,
            related_component,
            component_parents,
        })
    }

    /// Direction used for related parents.
    #[must_use]
    pub const fn direction(&self) -> RelationDirection {
        self.direction
    }

    /// Number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nearest.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nearest.is_empty()
    }

    /// The nearest parent of `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not a node of the indexed graph.
    #[must_use]
    pub fn nearest_parent(&self, idx: NodeIndex) -> NodeIndex {
        self.nearest[idx.index()]
    }

    /// Related parents of `idx`: itself first when it is a parent, then the
    /// others in construction order.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not a node of the indexed graph.
    pub fn related_parents(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        let head = self.is_parent[idx.index()].then_some(idx);
        let rest = self.related_component[idx.index()]
            .map_or(&[][..], |c| self.component_parents[c].as_slice());
        head.into_iter()
            .chain(rest.iter().copied().filter(move |&p| p != idx))
    }

    /// Number of related parents of `idx`, without iterating them.
    ///
    /// A parent always belongs to the component it relates to, so its own
    /// entry is already among the component's parents.
    #[must_use]
    pub fn related_count(&self, idx: NodeIndex) -> usize {
        let component = self.related_component[idx.index()]
            .map_or(0, |c| self.component_parents[c].len());
        if self.is_parent[idx.index()] {
            component.max(1)
        } else {
            component
        }
    }
}

/// Resolve every node's nearest parent, sharing work along chains.
fn resolve_nearest(graph: &RedirectGraph) -> Result<Vec<NodeIndex>, ResolveError> {
    let bound = graph.node_count();
    let mut nearest: Vec<Option<NodeIndex>> = vec![None; bound];
    let mut path: Vec<NodeIndex> = Vec::new();

    for start in graph.node_indices() {
        if nearest[start.index()].is_some() {
            continue;
        }

        path.clear();
        let mut current = start;
        let parent = loop {
            if graph.node(current).is_parent {
                break current;
            }
            if let Some(known) = nearest[current.index()] {
                break known;
            }
            path.push(current);
            if path.len() > bound {
                return Err(incomplete(graph, start, bound));
            }
            current = graph
                .successor(current)
                .ok_or_else(|| incomplete(graph, start, bound))?;
        };

        nearest[current.index()] = Some(parent);
        for node in &path {
            nearest[node.index()] = Some(parent);
        }
    }

    nearest
        .into_iter()
        .zip(graph.node_indices())
        .map(|(resolved, idx)| resolved.ok_or_else(|| incomplete(graph, idx, bound)))
        .collect()
}

fn incomplete(graph: &RedirectGraph, idx: NodeIndex, bound: usize) -> ResolveError {
    ResolveError::ResolutionIncomplete {
        node: graph.id(idx).to_string(),
        bound,
    }
}

// ---------------------------------------------------------------------------
// Single-node queries
// ---------------------------------------------------------------------------

/// Follow redirects from `idx` until a parent is reached.
///
/// # Errors
///
/// Returns [`ResolveError::ResolutionIncomplete`] when no parent is reached
/// within `node_count` hops or the chain ends at a non-parent.
pub fn nearest_parent(graph: &RedirectGraph, idx: NodeIndex) -> Result<NodeIndex, ResolveError> {
    let bound = graph.node_count();
    let mut current = idx;
    for _ in 0..=bound {
        if graph.node(current).is_parent {
            return Ok(current);
        }
        current = graph
            .successor(current)
            .ok_or_else(|| incomplete(graph, idx, bound))?;
    }
    Err(incomplete(graph, idx, bound))
}

/// Related parents of `idx` computed by breadth-first traversal.
///
/// Same ordering as [`RelationIndex::related_parents`].
#[must_use]
pub fn related_parents_by_traversal(
    graph: &RedirectGraph,
    idx: NodeIndex,
    direction: RelationDirection,
) -> Vec<NodeIndex> {
    let edge_direction = match direction {
        RelationDirection::Descendants => Direction::Incoming,
        RelationDirection::Successors => Direction::Outgoing,
    };

    let mut seen: HashSet<NodeIndex> = HashSet::from([idx]);
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([idx]);
    let mut reached = Vec::new();

    while let Some(current) = queue.pop_front() {
        for next in graph.graph.neighbors_directed(current, edge_direction) {
            if seen.insert(next) {
                reached.push(next);
                queue.push_back(next);
            }
        }
    }

    let mut parents: Vec<NodeIndex> = reached
        .into_iter()
        .filter(|&n| graph.node(n).is_parent)
        .collect();
    parents.sort_unstable();
    if graph.node(idx).is_parent {
        parents.insert(0, idx);
    }
    parents
}
