//! End-to-end resolution: rows → graph → parents → relations → clusters.

use serde_json::Value;
use tracing::{info, instrument};

use crate::cluster::{ClusterMap, aggregate};
use crate::config::ResolveConfig;
use crate::error::ResolveError;
use crate::graph::{RedirectGraph, RelationIndex, label_parents};
use crate::row::{RedirectRow, parse_rows};
use crate::stats::ResolutionStats;

/// Everything one run produces.
///
/// The graph keeps the per-site attributes (`is_parent`, `ancestors`), the
/// relation index answers nearest/related parent queries, and `clusters` is
/// the output handed to write-back.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub graph: RedirectGraph,
    pub relations: RelationIndex,
    pub clusters: ClusterMap,
    pub stats: ResolutionStats,
}

impl Resolution {
    /// Nearest parent id of a site.
    #[must_use]
    pub fn nearest_parent(&self, site_id: &str) -> Option<&str> {
        let idx = self.graph.node_index(site_id)?;
        Some(self.graph.id(self.relations.nearest_parent(idx)))
    }

    /// Related parent ids of a site, in relation order.
    #[must_use]
    pub fn related_parents(&self, site_id: &str) -> Option<Vec<&str>> {
        let idx = self.graph.node_index(site_id)?;
        Some(
            self.relations
                .related_parents(idx)
                .map(|p| self.graph.id(p))
                .collect(),
        )
    }

    /// Content hash of the input graph.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.graph.content_hash
    }
}

/// Run all four stages over typed rows.
///
/// # Errors
///
/// Returns [`ResolveError::MissingReference`] for dangling redirects (under
/// the abort policy) and [`ResolveError::ResolutionIncomplete`] if parent
/// resolution breaks its invariant.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn resolve(rows: &[RedirectRow], config: &ResolveConfig) -> Result<Resolution, ResolveError> {
    let mut graph = RedirectGraph::from_rows(rows, config.on_missing_reference)?;
    label_parents(&mut graph);
    let relations = RelationIndex::build(&graph, config.related_parents)?;
    let clusters = aggregate(&graph, &relations);
    let stats = ResolutionStats::collect(&graph, &clusters);

    info!(
        nodes = stats.node_count,
        parents = stats.parent_count,
        cycles = stats.cycle_count,
        clusters = stats.cluster_count,
        unassigned = stats.unassigned_count,
        hash = %graph.content_hash,
        "resolved redirect clusters"
    );

    Ok(Resolution {
        graph,
        relations,
        clusters,
        stats,
    })
}

/// Parse loosely typed rows, then [`resolve`] them.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedRow`] for the first row with the wrong
/// shape, otherwise whatever [`resolve`] returns.
pub fn resolve_values(rows: &[Vec<Value>], config: &ResolveConfig) -> Result<Resolution, ResolveError> {
    let rows = parse_rows(rows)?;
    resolve(&rows, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_loosely_typed_rows() {
        let rows = vec![
            json!([1, "one.example", false, true, 2, "two.example"]),
            json!([2, "two.example", false, false, null, null]),
        ]
        .into_iter()
        .map(|v| v.as_array().cloned().unwrap_or_default())
        .collect::<Vec<_>>();

        let resolution = resolve_values(&rows, &ResolveConfig::default()).expect("resolve");
        assert_eq!(resolution.nearest_parent("1"), Some("2"));
        assert_eq!(resolution.related_parents("2"), Some(vec!["2"]));
        assert!(resolution.clusters.contains("2"));
        assert_eq!(resolution.nearest_parent("missing"), None);
    }

    #[test]
    fn malformed_row_aborts_before_graph_is_built() {
        let rows = vec![vec![json!("a"), json!("a.example")]];
        let err = resolve_values(&rows, &ResolveConfig::default()).expect_err("short row");
        assert!(matches!(err, ResolveError::MalformedRow { row: 0, .. }));
    }
}
