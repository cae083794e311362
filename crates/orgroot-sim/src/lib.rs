#![forbid(unsafe_code)]
//! orgroot-sim library.
//!
//! Generates seeded redirect extracts, resolves them with `orgroot-core`, and
//! checks every result against the invariant oracle.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod campaign;
pub mod oracle;
pub mod rng;
pub mod scenario;

pub use campaign::{CampaignConfig, CampaignReport, SeedFailure, SeedReplay, run_campaign};
pub use oracle::{InvariantOracle, InvariantViolation, OracleResult};
pub use rng::DeterministicRng;
pub use scenario::{ScenarioConfig, generate_rows};
