#![no_main]

use libfuzzer_sys::fuzz_target;
use orgroot_core::graph::related_parents_by_traversal;
use orgroot_core::{RedirectRow, ResolveConfig, resolve};

// Each byte pair is (site, target); a target byte >= 0x80 means no redirect.
fuzz_target!(|data: &[u8]| {
    let rows: Vec<RedirectRow> = data
        .chunks_exact(2)
        .map(|pair| {
            let id = format!("s{}", pair[0] % 64);
            if pair[1] >= 0x80 {
                RedirectRow::terminal(id.clone(), id, pair[1] & 1 == 1)
            } else {
                let target = format!("s{}", pair[1] % 64);
                RedirectRow::redirecting(id.clone(), id, false, target.clone(), target)
            }
        })
        .collect();
    let ids: std::collections::HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    if rows
        .iter()
        .filter_map(RedirectRow::redirect_target)
        .any(|t| !ids.contains(t))
    {
        return;
    }

    let config = ResolveConfig::default();
    let resolution = resolve(&rows, &config).expect("closed rows resolve");
    let graph = &resolution.graph;
    for idx in graph.node_indices() {
        let indexed: Vec<_> = resolution.relations.related_parents(idx).collect();
        assert_eq!(indexed, related_parents_by_traversal(graph, idx, config.related_parents));
        assert!(graph.node(resolution.relations.nearest_parent(idx)).is_parent);
    }
});
