//! Redirect graph and the per-site relations derived from it.
//!
//! # Overview
//!
//! ```text
//! rows
//!   ↓  build::RedirectGraph::from_rows()
//! RedirectGraph (out-degree ≤ 1, chains and cycles)
//!   ↓  parents::label_parents()
//! RedirectGraph with is_parent / ancestors attached
//!   ↓  relations::RelationIndex::build()
//! RelationIndex (nearest parent, related parents)
//! ```
//!
//! The cluster map is folded from the last two by [`crate::cluster`].

pub mod build;
pub mod parents;
pub mod relations;

// Re-export primary types at module level for convenience.
pub use build::{RedirectGraph, SiteNode};
pub use parents::label_parents;
pub use relations::{RelationIndex, nearest_parent, related_parents_by_traversal};
