use orgroot_core::graph::{nearest_parent, related_parents_by_traversal};
use orgroot_core::{RedirectRow, Resolution, ResolveConfig, resolve};

// ── Result types ─────────────────────────────────────────────────────────────

/// Outcome of one or more invariant checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

/// A single broken invariant, with the sites involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A site without a redirect was not labelled a parent.
    TerminalNotParent { site: String },

    /// A nearest parent is not a parent, or is not its own nearest parent.
    NearestNotFixedPoint { site: String, nearest: String },

    /// The relation index disagrees with a direct walk.
    RelationMismatch {
        site: String,
        indexed: Vec<String>,
        walked: Vec<String>,
    },

    /// A non-parent site ended up in no cluster.
    UnexpectedUnassigned { site: String },

    /// A site is a member of more than one cluster.
    Duplicated { site: String },

    /// A cluster's generic flag is not explained by its members or by the
    /// parents related to its operating parent.
    GenericMismatch {
        parent: String,
        cluster_generic: bool,
        members_generic: bool,
        related_generic: bool,
    },

    /// Resolving the same rows again produced a different result.
    NonIdempotent { detail: String },
}

// ── Oracle ───────────────────────────────────────────────────────────────────

/// Checks a [`Resolution`] against the invariants every run must keep.
///
/// 1. **Terminals** (`check_terminals`): sites without a redirect are parents.
/// 2. **Fixed point** (`check_nearest`): nearest parents are parents and map
///    to themselves; the index agrees with a forward walk.
/// 3. **Relations** (`check_relations`): the index agrees with a BFS.
/// 4. **Partition** (`check_partition`): only parents merged under the
///    multi-parent rule may be unassigned; nobody is in two clusters.
/// 5. **Generic** (`check_generic`): a generic member makes the cluster
///    generic; a generic cluster has a generic member or related parent.
/// 6. **Idempotence** (`check_idempotence`): a rerun is identical.
pub struct InvariantOracle;

impl InvariantOracle {
    #[must_use]
    pub fn check_terminals(resolution: &Resolution) -> OracleResult {
        let graph = &resolution.graph;
        let violations = graph
            .node_indices()
            .filter(|&idx| graph.successor(idx).is_none() && !graph.node(idx).is_parent)
            .map(|idx| InvariantViolation::TerminalNotParent {
                site: graph.id(idx).to_string(),
            })
            .collect();
        OracleResult::from_violations(violations)
    }

    #[must_use]
    pub fn check_nearest(resolution: &Resolution) -> OracleResult {
        let graph = &resolution.graph;
        let mut violations = Vec::new();

        for idx in graph.node_indices() {
            let nearest = resolution.relations.nearest_parent(idx);
            let fixed = graph.node(nearest).is_parent
                && resolution.relations.nearest_parent(nearest) == nearest
                && nearest_parent(graph, idx).ok() == Some(nearest);
            if !fixed {
                violations.push(InvariantViolation::NearestNotFixedPoint {
                    site: graph.id(idx).to_string(),
                    nearest: graph.id(nearest).to_string(),
                });
            }
        }

        OracleResult::from_violations(violations)
    }

    #[must_use]
    pub fn check_relations(resolution: &Resolution) -> OracleResult {
        let graph = &resolution.graph;
        let direction = resolution.relations.direction();
        let mut violations = Vec::new();

        for idx in graph.node_indices() {
            let indexed: Vec<String> = resolution
                .relations
                .related_parents(idx)
                .map(|p| graph.id(p).to_string())
                .collect();
            let walked: Vec<String> = related_parents_by_traversal(graph, idx, direction)
                .into_iter()
                .map(|p| graph.id(p).to_string())
                .collect();
            if indexed != walked {
                violations.push(InvariantViolation::RelationMismatch {
                    site: graph.id(idx).to_string(),
                    indexed,
                    walked,
                });
            }
        }

        OracleResult::from_violations(violations)
    }

    #[must_use]
    pub fn check_partition(resolution: &Resolution) -> OracleResult {
        let graph = &resolution.graph;
        let audit = resolution.clusters.audit(graph);
        let mut violations = Vec::new();

        for site in audit.unassigned {
            let Some(idx) = graph.node_index(&site) else {
                continue;
            };
            let merged = graph.node(idx).is_parent && resolution.relations.related_count(idx) > 1;
            if !merged {
                violations.push(InvariantViolation::UnexpectedUnassigned { site });
            }
        }
        violations.extend(
            audit
                .duplicated
                .into_iter()
                .map(|site| InvariantViolation::Duplicated { site }),
        );

        OracleResult::from_violations(violations)
    }

    #[must_use]
    pub fn check_generic(resolution: &Resolution) -> OracleResult {
        let graph = &resolution.graph;
        let mut violations = Vec::new();

        for cluster in &resolution.clusters {
            let members_generic = cluster
                .members
                .iter()
                .any(|id| graph.node_by_id(id).is_some_and(|n| n.is_generic));
            let related_generic = graph.node_index(&cluster.parent_id).is_some_and(|idx| {
                resolution
                    .relations
                    .related_parents(idx)
                    .any(|p| graph.node(p).is_generic)
            });

            let consistent = if cluster.generic {
                members_generic || related_generic
            } else {
                !members_generic
            };
            if !consistent {
                violations.push(InvariantViolation::GenericMismatch {
                    parent: cluster.parent_id.clone(),
                    cluster_generic: cluster.generic,
                    members_generic,
                    related_generic,
                });
            }
        }

        OracleResult::from_violations(violations)
    }

    #[must_use]
    pub fn check_idempotence(
        rows: &[RedirectRow],
        config: &ResolveConfig,
        resolution: &Resolution,
    ) -> OracleResult {
        let detail = match resolve(rows, config) {
            Err(err) => Some(format!("rerun failed: {err}")),
            Ok(rerun) if rerun.clusters != resolution.clusters => {
                Some("cluster maps differ".to_string())
            }
            Ok(rerun) if rerun.stats != resolution.stats => Some(format!(
                "stats differ: {:?} vs {:?}",
                resolution.stats, rerun.stats
            )),
            Ok(rerun) if rerun.content_hash() != resolution.content_hash() => {
                Some("content hashes differ".to_string())
            }
            Ok(_) => None,
        };
        OracleResult::from_violations(
            detail
                .map(|detail| InvariantViolation::NonIdempotent { detail })
                .into_iter()
                .collect(),
        )
    }

    /// Run every check and accumulate the violations.
    #[must_use]
    pub fn check_all(
        rows: &[RedirectRow],
        config: &ResolveConfig,
        resolution: &Resolution,
    ) -> OracleResult {
        Self::check_terminals(resolution)
            .merge(Self::check_nearest(resolution))
            .merge(Self::check_relations(resolution))
            .merge(Self::check_partition(resolution))
            .merge(Self::check_generic(resolution))
            .merge(Self::check_idempotence(rows, config, resolution))
    }
}
