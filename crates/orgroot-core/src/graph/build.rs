//! Graph construction from extracted redirect rows.
//!
//! # Overview
//!
//! Each row names a site and, optionally, the site it now redirects to. This
//! module turns the rows into a [`petgraph`] directed graph where an edge
//! `A → B` means "A redirects to B".
//!
//! ## Node Order
//!
//! Nodes are added in first-seen order: for each row, the row's own site,
//! then its redirect target if that target has not been seen yet. Every
//! later stage iterates in this order, and the cluster tie-breaks depend on
//! it, so it is part of the output contract.
//!
//! ## Duplicate Ids
//!
//! Rows are indexed by id before the graph is built. A later row with an id
//! already seen replaces the earlier row's content but keeps its position.
//! Since each id ends up with exactly one row, every node has out-degree 0
//! or 1.
//!
//! ## Cache Invalidation
//!
//! [`RedirectGraph::content_hash`] is a BLAKE3 hash over the ordered nodes
//! (id, name, generic flag) and edges. An unchanged hash means an unchanged
//! cluster map, so a periodic job can skip the run.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use tracing::{debug, instrument, warn};

use crate::config::MissingReferencePolicy;
use crate::error::ResolveError;
use crate::row::RedirectRow;

// ---------------------------------------------------------------------------
// SiteNode
// ---------------------------------------------------------------------------

/// Node weight: one site record plus the attributes later stages attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteNode {
    pub id: String,
    pub name: String,
    pub is_generic: bool,
    /// Set by [`crate::graph::parents::label_parents`].
    pub is_parent: bool,
    /// Every id that reaches this node's terminal component, the component
    /// itself included. Shared by all members of a cycle.
    ///
    /// Only populated for parents with at least one ancestor.
    pub(crate) ancestry: Option<Arc<BTreeSet<String>>>,
}

impl SiteNode {
    fn new(id: &str, name: &str, is_generic: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_generic,
            is_parent: false,
            ancestry: None,
        }
    }

    /// Whether any other site redirects into this one, directly or not.
    #[must_use]
    pub const fn has_ancestors(&self) -> bool {
        self.ancestry.is_some()
    }

    /// Ids that transitively redirect into this node, excluding itself, in
    /// id order.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> + '_ {
        self.ancestry
            .iter()
            .flat_map(|set| set.iter())
            .map(String::as_str)
            .filter(move |id| *id != self.id)
    }

    /// Number of ancestors.
    #[must_use]
    pub fn ancestor_count(&self) -> usize {
        self.ancestry.as_ref().map_or(0, |set| set.len().saturating_sub(1))
    }
}

impl Serialize for SiteNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SiteNode", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("is_generic", &self.is_generic)?;
        state.serialize_field("is_parent", &self.is_parent)?;
        let ancestors: Option<Vec<&str>> = self.has_ancestors().then(|| self.ancestors().collect());
        state.serialize_field("ancestors", &ancestors)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// RedirectGraph
// ---------------------------------------------------------------------------

/// Directed redirect graph with an id → index map.
///
/// petgraph keeps both outgoing and incoming adjacency per node, so the
/// reverse index used for backward traversals is built together with the
/// forward one.
#[derive(Debug, Clone)]
pub struct RedirectGraph {
    /// Nodes = sites, edges = redirects.
    pub graph: DiGraph<SiteNode, ()>,
    /// Mapping from site id to petgraph `NodeIndex`.
    pub node_map: HashMap<String, NodeIndex>,
    /// BLAKE3 content hash of nodes and edges.
    pub content_hash: String,
}

impl RedirectGraph {
    /// Build a [`RedirectGraph`] from rows in input order.
    ///
    /// A redirect target inherits its generic flag from its own row. When a
    /// node is first created as somebody's redirect target, its name comes
    /// from the redirecting row until its own row is reached.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MissingReference`] when a redirect target is
    /// not among the input ids and `on_missing` is
    /// [`MissingReferencePolicy::Abort`].
    #[instrument(skip(rows), fields(rows = rows.len()))]
    pub fn from_rows(
        rows: &[RedirectRow],
        on_missing: MissingReferencePolicy,
    ) -> Result<Self, ResolveError> {
        let records = index_rows(rows);
        let by_id: HashMap<&str, &RedirectRow> =
            records.iter().map(|(_, row)| (row.id.as_str(), *row)).collect();

        let mut graph = DiGraph::<SiteNode, ()>::with_capacity(records.len(), records.len());
        let mut node_map: HashMap<String, NodeIndex> = HashMap::with_capacity(records.len());
        let mut dropped = 0_usize;

        for (row_idx, row) in &records {
            let source = match node_map.get(row.id.as_str()) {
                Some(&idx) => {
                    // Seen earlier as a redirect target; the own row is authoritative.
                    let node = &mut graph[idx];
                    node.name.clone_from(&row.name);
                    node.is_generic = row.is_generic;
                    idx
                }
                None => {
                    let idx = graph.add_node(SiteNode::new(&row.id, &row.name, row.is_generic));
                    node_map.insert(row.id.clone(), idx);
                    idx
                }
            };

            let Some(target_id) = row.redirect_target() else {
                continue;
            };

            let Some(target_row) = by_id.get(target_id) else {
                match on_missing {
                    MissingReferencePolicy::Abort => {
                        return Err(ResolveError::MissingReference {
                            row: *row_idx,
                            source_id: row.id.clone(),
                            target_id: target_id.to_string(),
                        });
                    }
                    MissingReferencePolicy::DropRedirect => {
                        warn!(source = %row.id, target = %target_id, "dropping redirect to unknown site");
                        dropped += 1;
                        continue;
                    }
                }
            };

            let target = *node_map.entry(target_id.to_string()).or_insert_with(|| {
                let name = row.redirect_name.as_deref().unwrap_or(target_row.name.as_str());
                graph.add_node(SiteNode::new(target_id, name, target_row.is_generic))
            });

            graph.add_edge(source, target, ());
        }

        let content_hash = compute_content_hash(&graph);

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dropped,
            "built redirect graph"
        );

        Ok(Self {
            graph,
            node_map,
            content_hash,
        })
    }

    /// Return the number of nodes (sites) in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of edges (redirects) in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the `NodeIndex` for a site id.
    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// Node weight for an index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not belong to this graph.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> &SiteNode {
        &self.graph[idx]
    }

    /// Node weight for a site id.
    #[must_use]
    pub fn node_by_id(&self, id: &str) -> Option<&SiteNode> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    /// Site id for an index.
    #[must_use]
    pub fn id(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].id
    }

    /// The redirect target of `idx`, if any.
    #[must_use]
    pub fn successor(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .next()
    }

    /// Nodes redirecting directly to `idx`.
    pub fn predecessors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    /// All node indices in construction order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Collapse rows by id: first-seen position, last-seen content.
///
/// Returns `(row position, row)` pairs in first-seen order.
fn index_rows(rows: &[RedirectRow]) -> Vec<(usize, &RedirectRow)> {
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    let mut records: Vec<(usize, &RedirectRow)> = Vec::with_capacity(rows.len());

    for (row_idx, row) in rows.iter().enumerate() {
        if let Some(&slot) = position.get(row.id.as_str()) {
            warn!(id = %row.id, row = row_idx, "duplicate site id; later row wins");
            records[slot] = (row_idx, row);
        } else {
            position.insert(row.id.as_str(), records.len());
            records.push((row_idx, row));
        }
    }

    records
}

/// Compute a BLAKE3 hash over the ordered node list and edge list.
fn compute_content_hash(graph: &DiGraph<SiteNode, ()>) -> String {
    let mut hasher = blake3::Hasher::new();
    for node in graph.node_weights() {
        hasher.update(node.id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(node.name.as_bytes());
        hasher.update(if node.is_generic { b"\x01" } else { b"\x00" });
    }
    hasher.update(b"\xff");
    for edge in graph.raw_edges() {
        hasher.update(graph[edge.source()].id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(graph[edge.target()].id.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
