#![forbid(unsafe_code)]
//! orgroot-core library.
//!
//! Resolves redirect chains between site records to a canonical parent per
//! chain or cycle, and groups every site by the parent it resolves to.
//!
//! # Conventions
//!
//! - **Errors**: Pipeline stages return [`ResolveError`]; config loading uses
//!   `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`). The
//!   library never installs a subscriber.
//!
//! # Usage
//!
//! ```rust
//! use orgroot_core::{RedirectRow, ResolveConfig, resolve};
//!
//! let rows = vec![
//!     RedirectRow::redirecting("1", "old.example", false, "2", "new.example"),
//!     RedirectRow::terminal("2", "new.example", false),
//! ];
//! let resolution = resolve(&rows, &ResolveConfig::default())?;
//! let cluster = resolution.clusters.get("2").expect("cluster keyed by 2");
//! assert_eq!(cluster.members.len(), 2);
//! # Ok::<(), orgroot_core::ResolveError>(())
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod row;
pub mod stats;

pub use cluster::{Assignment, Cluster, ClusterMap, PartitionAudit, aggregate};
pub use config::{MissingReferencePolicy, RelationDirection, ResolveConfig};
pub use error::{ErrorCode, ErrorKind, ResolveError};
pub use graph::{RedirectGraph, RelationIndex, SiteNode, label_parents};
pub use pipeline::{Resolution, resolve, resolve_values};
pub use row::RedirectRow;
pub use stats::ResolutionStats;
