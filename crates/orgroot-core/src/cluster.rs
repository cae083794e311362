//! Cluster aggregation: folding per-site relations into organizations.
//!
//! # Policy
//!
//! Sites are visited once, in graph construction order. For each site `n`:
//!
//! 1. `n` is a parent with at most one related parent (itself): its cluster
//!    is created, or, if it already exists, `n`'s generic flag is OR-ed in.
//! 2. `n` is a parent with several related parents: when none of them keys a
//!    cluster yet, `n` starts one. Otherwise the first related parent that
//!    keys a cluster is the *operating parent*; `n`'s generic flag is OR-ed
//!    into that cluster but `n` is **not** added to its members.
//! 3. `n` is not a parent: the operating parent is the first related parent
//!    keying a cluster when there are several related parents and one of them
//!    is a key, and `n`'s nearest parent otherwise. The operating parent's
//!    cluster is created on demand (seeded with the operating parent itself),
//!    then `n` joins it.
//!
//! The outcome depends on visiting order; that order is the graph's
//! construction order and is reproducible for a given input.
//!
//! # Known Exception
//!
//! Rule 2 leaves the merged parent outside every cluster's members. In a
//! two-site cycle `1 → 2 → 1` both sites are parents; `1` keys the cluster
//! and `2` only contributes its generic flag. [`ClusterMap::audit`] lists
//! such sites so callers can decide what to do with them.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::graph::NodeIndex;
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

use crate::graph::build::{RedirectGraph, SiteNode};
use crate::graph::relations::RelationIndex;

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// One organization: an operating parent and every site folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub parent_id: String,
    /// Name of the operating parent.
    pub canonical_name: String,
    /// OR of the generic flag over everything folded in. Never reset.
    pub generic: bool,
    /// Member site ids, always including the operating parent.
    pub members: BTreeSet<String>,
    /// Member names, grown in lockstep with `members`.
    pub member_names: BTreeSet<String>,
}

impl Cluster {
    fn seeded(parent: &SiteNode) -> Self {
        Self {
            parent_id: parent.id.clone(),
            canonical_name: parent.name.clone(),
            generic: parent.is_generic,
            members: BTreeSet::from([parent.id.clone()]),
            member_names: BTreeSet::from([parent.name.clone()]),
        }
    }

    fn absorb(&mut self, node: &SiteNode) {
        self.members.insert(node.id.clone());
        self.member_names.insert(node.name.clone());
        self.generic |= node.is_generic;
    }

    /// Number of member sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for clusters built by [`aggregate`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// What the write-back step stamps onto one site's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub site_id: String,
    pub parent_id: String,
    pub canonical_name: String,
    pub generic: bool,
}

/// Sites that break the partition property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionAudit {
    /// Sites in no cluster, in construction order.
    pub unassigned: Vec<String>,
    /// Sites in more than one cluster, in construction order.
    pub duplicated: Vec<String>,
}

impl PartitionAudit {
    /// True when every site is in exactly one cluster.
    #[must_use]
    pub fn is_partition(&self) -> bool {
        self.unassigned.is_empty() && self.duplicated.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ClusterMap
// ---------------------------------------------------------------------------

/// Clusters in creation order, looked up by operating-parent id.
///
/// Serializes as a map from parent id to [`Cluster`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMap {
    clusters: Vec<Cluster>,
    by_parent: HashMap<String, usize>,
}

impl ClusterMap {
    /// Number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Cluster keyed by `parent_id`.
    #[must_use]
    pub fn get(&self, parent_id: &str) -> Option<&Cluster> {
        self.by_parent.get(parent_id).map(|&slot| &self.clusters[slot])
    }

    /// Whether `parent_id` keys a cluster.
    #[must_use]
    pub fn contains(&self, parent_id: &str) -> bool {
        self.by_parent.contains_key(parent_id)
    }

    /// Clusters in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    /// Parent ids in creation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.clusters.iter().map(|c| c.parent_id.as_str())
    }

    /// One [`Assignment`] per member site, in cluster creation order.
    ///
    /// A site listed by several clusters is assigned to the first.
    #[must_use]
    pub fn assignments(&self) -> Vec<Assignment> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for cluster in &self.clusters {
            for member in &cluster.members {
                if seen.insert(member.as_str()) {
                    out.push(Assignment {
                        site_id: member.clone(),
                        parent_id: cluster.parent_id.clone(),
                        canonical_name: cluster.canonical_name.clone(),
                        generic: cluster.generic,
                    });
                }
            }
        }
        out
    }

    /// Check every site of `graph` against the partition property.
    #[must_use]
    pub fn audit(&self, graph: &RedirectGraph) -> PartitionAudit {
        let mut membership: HashMap<&str, usize> = HashMap::with_capacity(graph.node_count());
        for cluster in &self.clusters {
            for member in &cluster.members {
                *membership.entry(member.as_str()).or_default() += 1;
            }
        }

        let mut audit = PartitionAudit::default();
        for idx in graph.node_indices() {
            let id = graph.id(idx);
            match membership.get(id).copied().unwrap_or(0) {
                0 => audit.unassigned.push(id.to_string()),
                1 => {}
                _ => audit.duplicated.push(id.to_string()),
            }
        }
        audit
    }

    fn slot(&self, parent_id: &str) -> Option<usize> {
        self.by_parent.get(parent_id).copied()
    }

    fn create(&mut self, parent: &SiteNode) -> usize {
        let slot = self.clusters.len();
        self.clusters.push(Cluster::seeded(parent));
        self.by_parent.insert(parent.id.clone(), slot);
        slot
    }

    fn slot_or_create(&mut self, parent: &SiteNode) -> usize {
        match self.slot(&parent.id) {
            Some(slot) => slot,
            None => self.create(parent),
        }
    }
}

impl Serialize for ClusterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.clusters.iter().map(|c| (&c.parent_id, c)))
    }
}

impl<'a> IntoIterator for &'a ClusterMap {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Fold every site into the cluster map.
#[instrument(skip_all, fields(nodes = graph.node_count()))]
pub fn aggregate(graph: &RedirectGraph, relations: &RelationIndex) -> ClusterMap {
    let mut map = ClusterMap::default();

    for idx in graph.node_indices() {
        let node = graph.node(idx);
        let many_parents = relations.related_count(idx) > 1;

        if node.is_parent {
            if many_parents {
                match first_keyed(&map, graph, relations, idx) {
                    Some(slot) => map.clusters[slot].generic |= node.is_generic,
                    None => {
                        map.create(node);
                    }
                }
            } else {
                match map.slot(&node.id) {
                    Some(slot) => map.clusters[slot].generic |= node.is_generic,
                    None => {
                        map.create(node);
                    }
                }
            }
            continue;
        }

        let keyed = if many_parents {
            first_keyed(&map, graph, relations, idx)
        } else {
            None
        };
        let slot = match keyed {
            Some(slot) => slot,
            None => map.slot_or_create(graph.node(relations.nearest_parent(idx))),
        };
        map.clusters[slot].absorb(node);
    }

    debug!(clusters = map.len(), "aggregated clusters");
    map
}

/// Slot of the first related parent of `idx` that already keys a cluster.
fn first_keyed(
    map: &ClusterMap,
    graph: &RedirectGraph,
    relations: &RelationIndex,
    idx: NodeIndex,
) -> Option<usize> {
    relations
        .related_parents(idx)
        .find_map(|parent| map.slot(graph.id(parent)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingReferencePolicy, RelationDirection};
    use crate::graph::parents::label_parents;
    use crate::row::RedirectRow;

    fn clusters(rows: &[RedirectRow], direction: RelationDirection) -> (RedirectGraph, ClusterMap) {
        let mut graph =
            RedirectGraph::from_rows(rows, MissingReferencePolicy::Abort).expect("build");
        label_parents(&mut graph);
        let relations = RelationIndex::build(&graph, direction).expect("index");
        let map = aggregate(&graph, &relations);
        (graph, map)
    }

    fn members(map: &ClusterMap, parent: &str) -> Vec<String> {
        map.get(parent)
            .map(|c| c.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn isolated_sites_get_singleton_clusters() {
        let (graph, map) = clusters(
            &[
                RedirectRow::terminal("a", "a.example", false),
                RedirectRow::terminal("b", "b.example", true),
            ],
            RelationDirection::Descendants,
        );
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(map.get("b").expect("b").generic);
        assert!(map.audit(&graph).is_partition());
    }

    #[test]
    fn chain_collapses_into_terminal_cluster() {
        let (_, map) = clusters(
            &[
                RedirectRow::redirecting("1", "one", false, "2", "two"),
                RedirectRow::redirecting("2", "two", false, "3", "three"),
                RedirectRow::terminal("3", "three", false),
            ],
            RelationDirection::Descendants,
        );
        assert_eq!(map.len(), 1);
        let cluster = map.get("3").expect("cluster 3");
        assert_eq!(cluster.canonical_name, "three");
        assert_eq!(members(&map, "3"), vec!["1", "2", "3"]);
        assert_eq!(
            cluster.member_names.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["one", "three", "two"]
        );
    }

    #[test]
    fn generic_flag_is_or_of_members() {
        let (_, map) = clusters(
            &[
                RedirectRow::redirecting("1", "one", true, "2", "two"),
                RedirectRow::terminal("2", "two", false),
            ],
            RelationDirection::Descendants,
        );
        assert!(map.get("2").expect("cluster 2").generic);
    }

    #[test]
    fn generic_parent_seen_after_creation_is_merged() {
        let (_, map) = clusters(
            &[
                RedirectRow::redirecting("1", "one", false, "2", "two"),
                RedirectRow::terminal("2", "two", true),
            ],
            RelationDirection::Descendants,
        );
        assert!(map.get("2").expect("cluster 2").generic);
    }

    #[test]
    fn merged_cycle_parent_is_left_out_of_members() {
        let (graph, map) = clusters(
            &[
                RedirectRow::redirecting("1", "one", false, "2", "two"),
                RedirectRow::redirecting("2", "two", true, "1", "one"),
            ],
            RelationDirection::Descendants,
        );
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1"]);
        assert_eq!(members(&map, "1"), vec!["1"]);
        assert!(map.get("1").expect("cluster 1").generic, "2's flag merged");

        let audit = map.audit(&graph);
        assert_eq!(audit.unassigned, vec!["2"]);
        assert!(audit.duplicated.is_empty());
    }

    #[test]
    fn tail_joins_cluster_of_its_entry_node() {
        // a <-> b keyed by a; t enters the cycle at b.
        let rows = [
            RedirectRow::redirecting("a", "a", false, "b", "b"),
            RedirectRow::redirecting("b", "b", false, "a", "a"),
            RedirectRow::redirecting("t", "t", false, "b", "b"),
        ];

        let (_, down) = clusters(&rows, RelationDirection::Descendants);
        assert_eq!(members(&down, "a"), vec!["a"]);
        assert_eq!(members(&down, "b"), vec!["b", "t"]);

        let (_, up) = clusters(&rows, RelationDirection::Successors);
        assert_eq!(up.len(), 1);
        assert_eq!(members(&up, "a"), vec!["a", "t"]);
    }

    #[test]
    fn assignments_cover_every_member_once() {
        let (_, map) = clusters(
            &[
                RedirectRow::redirecting("1", "one", false, "3", "three"),
                RedirectRow::redirecting("2", "two", true, "3", "three"),
                RedirectRow::terminal("3", "three", false),
                RedirectRow::terminal("4", "four", false),
            ],
            RelationDirection::Descendants,
        );
        let assignments = map.assignments();
        let ids: Vec<&str> = assignments.iter().map(|a| a.site_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        let one = &assignments[0];
        assert_eq!(one.parent_id, "3");
        assert_eq!(one.canonical_name, "three");
        assert!(one.generic);
        assert!(!assignments[3].generic);
    }

    #[test]
    fn serializes_as_map_keyed_by_parent() {
        let (_, map) = clusters(
            &[
                RedirectRow::redirecting("1", "one", false, "2", "two"),
                RedirectRow::terminal("2", "two", false),
            ],
            RelationDirection::Descendants,
        );
        let json = serde_json::to_value(&map).expect("serialize");
        assert_eq!(json["2"]["canonical_name"], "two");
        assert_eq!(json["2"]["members"], serde_json::json!(["1", "2"]));
    }
}
