//! End-to-end resolution scenarios over small hand-built redirect graphs.

use std::collections::BTreeSet;

use orgroot_core::{
    MissingReferencePolicy, RedirectRow, RelationDirection, ResolveConfig, ResolveError, resolve,
    resolve_values,
};
use serde_json::json;

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn members(resolution: &orgroot_core::Resolution, parent: &str) -> BTreeSet<String> {
    resolution
        .clusters
        .get(parent)
        .unwrap_or_else(|| panic!("no cluster keyed by {parent}"))
        .members
        .clone()
}

#[test]
fn chain_collapses_to_terminal() {
    let rows = [
        RedirectRow::redirecting("1", "one", false, "2", "two"),
        RedirectRow::redirecting("2", "two", false, "3", "three"),
        RedirectRow::terminal("3", "three", false),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    assert_eq!(resolution.clusters.len(), 1);
    assert_eq!(members(&resolution, "3"), ids(&["1", "2", "3"]));
    assert_eq!(resolution.clusters.get("3").map(|c| c.canonical_name.as_str()), Some("three"));

    let terminal = resolution.graph.node_by_id("3").expect("node 3");
    assert!(terminal.is_parent);
    assert_eq!(terminal.ancestors().collect::<Vec<_>>(), vec!["1", "2"]);
    assert!(resolution.clusters.audit(&resolution.graph).is_partition());
}

#[test]
fn fan_in_shares_one_cluster() {
    let rows = [
        RedirectRow::redirecting("1", "one", false, "3", "three"),
        RedirectRow::redirecting("2", "two", false, "3", "three"),
        RedirectRow::terminal("3", "three", false),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    assert_eq!(resolution.clusters.len(), 1);
    assert_eq!(members(&resolution, "3"), ids(&["1", "2", "3"]));
    assert_eq!(
        resolution.clusters.get("3").map(|c| c.member_names.clone()),
        Some(ids(&["one", "two", "three"]))
    );
}

#[test]
fn generic_flag_propagates_to_terminal_cluster() {
    let rows = [
        RedirectRow::redirecting("1", "one", true, "2", "two"),
        RedirectRow::terminal("2", "two", false),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    let cluster = resolution.clusters.get("2").expect("cluster 2");
    assert!(cluster.generic);
    assert!(!resolution.graph.node_by_id("2").expect("node 2").is_generic);
}

#[test]
fn self_redirect_is_its_own_parent() {
    let rows = [RedirectRow::redirecting("1", "one", false, "1", "one")];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    let node = resolution.graph.node_by_id("1").expect("node 1");
    assert!(node.is_parent);
    assert!(!node.has_ancestors());
    assert_eq!(node.ancestor_count(), 0);
    assert_eq!(members(&resolution, "1"), ids(&["1"]));
    assert_eq!(resolution.stats.parent_count, 1);
}

#[test]
fn two_site_cycle_keys_first_site_and_leaves_second_unassigned() {
    let rows = [
        RedirectRow::redirecting("1", "one", false, "2", "two"),
        RedirectRow::redirecting("2", "two", true, "1", "one"),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    assert!(resolution.graph.node_by_id("1").expect("node 1").is_parent);
    assert!(resolution.graph.node_by_id("2").expect("node 2").is_parent);

    assert_eq!(resolution.clusters.keys().collect::<Vec<_>>(), vec!["1"]);
    let cluster = resolution.clusters.get("1").expect("cluster 1");
    assert_eq!(cluster.members, ids(&["1"]));
    assert!(cluster.generic, "node 2's generic flag is merged in");

    let audit = resolution.clusters.audit(&resolution.graph);
    assert_eq!(audit.unassigned, vec!["2".to_string()]);
    assert!(audit.duplicated.is_empty());
}

#[test]
fn tail_into_cycle_joins_first_cycle_site() {
    let rows = [
        RedirectRow::redirecting("t", "tail", false, "a", "a"),
        RedirectRow::redirecting("a", "a", false, "b", "b"),
        RedirectRow::redirecting("b", "b", false, "a", "a"),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    assert!(!resolution.graph.node_by_id("t").expect("t").is_parent);
    assert_eq!(resolution.nearest_parent("t"), Some("a"));
    assert_eq!(members(&resolution, "a"), ids(&["a", "t"]));
    assert_eq!(
        resolution.clusters.audit(&resolution.graph).unassigned,
        vec!["b".to_string()]
    );
}

#[test]
fn successor_relations_route_tail_through_keyed_cycle_parent() {
    let config = ResolveConfig {
        related_parents: RelationDirection::Successors,
        ..ResolveConfig::default()
    };
    let rows = [
        RedirectRow::redirecting("a", "a", false, "b", "b"),
        RedirectRow::redirecting("b", "b", false, "a", "a"),
        RedirectRow::redirecting("t", "tail", false, "b", "b"),
    ];
    let resolution = resolve(&rows, &config).expect("resolve");

    // t's nearest parent is b, but a keys the cycle's cluster.
    assert_eq!(resolution.nearest_parent("t"), Some("b"));
    assert_eq!(resolution.related_parents("t"), Some(vec!["a", "b"]));
    assert_eq!(members(&resolution, "a"), ids(&["a", "t"]));
    assert!(!resolution.clusters.contains("b"));
}

#[test]
fn descendant_relations_leave_chain_sites_without_related_parents() {
    let rows = [
        RedirectRow::redirecting("1", "one", false, "2", "two"),
        RedirectRow::terminal("2", "two", false),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    assert_eq!(resolution.related_parents("1"), Some(Vec::new()));
    assert_eq!(resolution.related_parents("2"), Some(vec!["2"]));
}

#[test]
fn every_terminal_is_a_parent_and_nearest_parent_is_a_fixed_point() {
    let rows = [
        RedirectRow::redirecting("1", "one", false, "2", "two"),
        RedirectRow::redirecting("2", "two", false, "3", "three"),
        RedirectRow::terminal("3", "three", false),
        RedirectRow::redirecting("4", "four", false, "5", "five"),
        RedirectRow::redirecting("5", "five", false, "6", "six"),
        RedirectRow::redirecting("6", "six", false, "5", "five"),
        RedirectRow::terminal("7", "seven", true),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");
    let graph = &resolution.graph;

    for idx in graph.node_indices() {
        if graph.successor(idx).is_none() {
            assert!(graph.node(idx).is_parent, "{} has no redirect", graph.id(idx));
        }
        let nearest = resolution.relations.nearest_parent(idx);
        assert!(graph.node(nearest).is_parent);
        assert_eq!(resolution.relations.nearest_parent(nearest), nearest);
    }
}

#[test]
fn long_cycle_resolves_with_shared_ancestry() {
    let n = 50_000_usize;
    let rows: Vec<RedirectRow> = (0..n)
        .map(|i| {
            let next = format!("s{}", (i + 1) % n);
            RedirectRow::redirecting(format!("s{i}"), format!("s{i}"), false, next.clone(), next)
        })
        .collect();
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    assert_eq!(resolution.stats.parent_count, n);
    assert_eq!(resolution.stats.cycle_count, 1);
    assert_eq!(resolution.clusters.keys().collect::<Vec<_>>(), vec!["s0"]);
    assert_eq!(resolution.stats.unassigned_count, n - 1);
    let last = resolution.graph.node_by_id(&format!("s{}", n - 1)).expect("last");
    assert_eq!(last.ancestor_count(), n - 1);
    assert_eq!(resolution.related_parents("s7").map(|p| p.len()), Some(n));
}

#[test]
fn reruns_produce_identical_clusters() {
    let rows = [
        RedirectRow::redirecting("1", "one", true, "2", "two"),
        RedirectRow::redirecting("2", "two", false, "1", "one"),
        RedirectRow::redirecting("3", "three", false, "1", "one"),
        RedirectRow::terminal("4", "four", false),
    ];
    let config = ResolveConfig::default();
    let first = resolve(&rows, &config).expect("first run");
    let second = resolve(&rows, &config).expect("second run");

    assert_eq!(first.clusters, second.clusters);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(
        serde_json::to_string(&first.clusters).expect("serialize"),
        serde_json::to_string(&second.clusters).expect("serialize")
    );
}

#[test]
fn duplicate_id_keeps_position_and_takes_later_content() {
    let rows = [
        RedirectRow::terminal("1", "stale", false),
        RedirectRow::terminal("2", "two", false),
        RedirectRow::redirecting("1", "fresh", false, "2", "two"),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");

    let first = resolution.graph.node_indices().next().expect("nodes");
    assert_eq!(resolution.graph.id(first), "1");
    assert_eq!(resolution.graph.node(first).name, "fresh");
    assert_eq!(resolution.graph.edge_count(), 1);
    assert_eq!(members(&resolution, "2"), ids(&["1", "2"]));
}

#[test]
fn missing_reference_aborts_by_default() {
    let rows = [RedirectRow::redirecting("1", "one", false, "9", "nine")];
    let err = resolve(&rows, &ResolveConfig::default()).expect_err("dangling redirect");

    assert_eq!(
        err,
        ResolveError::MissingReference {
            row: 0,
            source_id: "1".to_string(),
            target_id: "9".to_string(),
        }
    );
    assert_eq!(err.code().code(), "E1002");
}

#[test]
fn missing_reference_can_be_dropped() {
    let config = ResolveConfig {
        on_missing_reference: MissingReferencePolicy::DropRedirect,
        ..ResolveConfig::default()
    };
    let rows = [RedirectRow::redirecting("1", "one", false, "9", "nine")];
    let resolution = resolve(&rows, &config).expect("resolve");

    assert_eq!(resolution.graph.node_count(), 1);
    assert_eq!(resolution.graph.edge_count(), 0);
    assert!(resolution.graph.node_by_id("9").is_none());
    assert_eq!(members(&resolution, "1"), ids(&["1"]));
}

#[test]
fn malformed_rows_are_rejected_with_row_number() {
    let rows = vec![
        vec![json!(1), json!("one"), json!(false), json!(false), json!(null), json!(null)],
        vec![json!(2), json!("two"), json!(false), json!(true), json!(null), json!(null)],
    ];
    let err = resolve_values(&rows, &ResolveConfig::default()).expect_err("no target");

    assert!(matches!(err, ResolveError::MalformedRow { row: 1, .. }));
    assert_eq!(err.code().code(), "E1001");
}

#[test]
fn empty_input_produces_empty_output() {
    let resolution = resolve(&[], &ResolveConfig::default()).expect("resolve");
    assert!(resolution.clusters.is_empty());
    assert!(resolution.relations.is_empty());
    assert!(resolution.clusters.audit(&resolution.graph).is_partition());
}

#[test]
fn assignments_cover_every_member_once() {
    let rows = [
        RedirectRow::redirecting("1", "one", false, "2", "two"),
        RedirectRow::terminal("2", "two", true),
        RedirectRow::terminal("3", "three", false),
    ];
    let resolution = resolve(&rows, &ResolveConfig::default()).expect("resolve");
    let assignments = resolution.clusters.assignments();

    assert_eq!(assignments.len(), 3);
    let one = assignments
        .iter()
        .find(|a| a.site_id == "1")
        .expect("site 1 assigned");
    assert_eq!(one.parent_id, "2");
    assert_eq!(one.canonical_name, "two");
    assert!(one.generic);
}
