//! Summary statistics for one resolution run.
//!
//! - **node_count** / **edge_count**: sites and redirects in the graph.
//! - **parent_count**: sites labelled as parents.
//! - **terminal_count**: parents without a redirect.
//! - **cycle_count**: redirect cycles (a self-redirect counts as one).
//! - **cluster_count** / **generic_cluster_count**: clusters, and how many
//!   of them carry the generic flag.
//! - **largest_cluster**: member count of the biggest cluster.
//! - **unassigned_count**: sites in no cluster (see [`crate::cluster`]).

use serde::Serialize;

use crate::cluster::ClusterMap;
use crate::graph::build::RedirectGraph;

/// Summary statistics for a resolved graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub parent_count: usize,
    pub terminal_count: usize,
    pub cycle_count: usize,
    pub cluster_count: usize,
    pub generic_cluster_count: usize,
    pub largest_cluster: usize,
    pub unassigned_count: usize,
}

impl ResolutionStats {
    /// Compute statistics from a labelled graph and its clusters.
    #[must_use]
    pub fn collect(graph: &RedirectGraph, clusters: &ClusterMap) -> Self {
        let mut parent_count = 0;
        let mut terminal_count = 0;
        let mut cycle_count = 0;
        let mut on_counted_cycle = vec![false; graph.node_count()];

        for idx in graph.node_indices() {
            if !graph.node(idx).is_parent {
                continue;
            }
            parent_count += 1;

            let Some(mut next) = graph.successor(idx) else {
                terminal_count += 1;
                continue;
            };
            if on_counted_cycle[idx.index()] {
                continue;
            }
            cycle_count += 1;
            on_counted_cycle[idx.index()] = true;
            while next != idx && !on_counted_cycle[next.index()] {
                on_counted_cycle[next.index()] = true;
                match graph.successor(next) {
                    Some(n) => next = n,
                    None => break,
                }
            }
        }

        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            parent_count,
            terminal_count,
            cycle_count,
            cluster_count: clusters.len(),
            generic_cluster_count: clusters.iter().filter(|c| c.generic).count(),
            largest_cluster: clusters.iter().map(|c| c.members.len()).max().unwrap_or(0),
            unassigned_count: clusters.audit(graph).unassigned.len(),
        }
    }
}
