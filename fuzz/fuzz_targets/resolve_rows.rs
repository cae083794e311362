#![no_main]

use libfuzzer_sys::fuzz_target;
use orgroot_core::{MissingReferencePolicy, ResolveConfig, resolve_values};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(rows) = serde_json::from_slice::<Vec<Vec<Value>>>(data) else {
        return;
    };
    let config = ResolveConfig {
        on_missing_reference: MissingReferencePolicy::DropRedirect,
        ..ResolveConfig::default()
    };
    if let Ok(resolution) = resolve_values(&rows, &config) {
        assert_eq!(resolution.stats.node_count, resolution.graph.node_count());
        assert!(resolution.clusters.audit(&resolution.graph).duplicated.is_empty());
    }
});
