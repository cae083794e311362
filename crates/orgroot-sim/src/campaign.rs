//! Seed campaigns: generate, resolve, and check many scenarios.
//!
//! Each seed yields one extract; the first failing seed is kept for replay.

use std::ops::Range;

use anyhow::{Context, Result, bail};
use orgroot_core::{RedirectRow, RelationDirection, Resolution, ResolveConfig, resolve};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::oracle::{InvariantOracle, InvariantViolation, OracleResult};
use crate::scenario::{ScenarioConfig, generate_rows};

/// Seeds to run and the scenario shape used for each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub seed_range: Range<u64>,
    pub site_count: usize,
    pub redirect_percent: u8,
    pub cycle_percent: u8,
    pub generic_percent: u8,
    pub duplicate_percent: u8,
    pub related_parents: RelationDirection,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let scenario = ScenarioConfig::default();
        Self {
            seed_range: 0..100,
            site_count: scenario.site_count,
            redirect_percent: scenario.redirect_percent,
            cycle_percent: scenario.cycle_percent,
            generic_percent: scenario.generic_percent,
            duplicate_percent: 5,
            related_parents: RelationDirection::default(),
        }
    }
}

impl CampaignConfig {
    /// Scenario for one seed.
    #[must_use]
    pub fn scenario_for_seed(&self, seed: u64) -> ScenarioConfig {
        ScenarioConfig {
            seed,
            site_count: self.site_count,
            redirect_percent: self.redirect_percent,
            cycle_percent: self.cycle_percent,
            generic_percent: self.generic_percent,
            duplicate_percent: self.duplicate_percent,
            shuffle_rows: true,
        }
    }

    /// Pipeline config used for every seed.
    #[must_use]
    pub fn resolve_config(&self) -> ResolveConfig {
        ResolveConfig {
            related_parents: self.related_parents,
            ..ResolveConfig::default()
        }
    }

    /// # Errors
    ///
    /// Returns an error if the seed range is empty or the scenario shape is
    /// invalid.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        self.scenario_for_seed(self.seed_range.start).validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First failing seed, for replay.
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Seeds whose clusters left at least one merged parent unassigned.
    pub partition_exceptions: usize,
    /// Seeds with at least one redirect cycle.
    pub seeds_with_cycles: usize,
}

impl CampaignReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything needed to debug one seed.
#[derive(Debug, Clone)]
pub struct SeedReplay {
    pub rows: Vec<RedirectRow>,
    pub resolution: Resolution,
    pub oracle: OracleResult,
}

/// Run every seed in the campaign.
///
/// # Errors
///
/// Returns an error if the config is invalid or a seed fails to resolve.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        partition_exceptions: 0,
        seeds_with_cycles: 0,
    };

    for seed in config.seed_range.clone() {
        report.seeds_run += 1;
        let replay = replay_seed(seed, config)?;

        if replay.resolution.stats.unassigned_count > 0 {
            report.partition_exceptions += 1;
        }
        if replay.resolution.stats.cycle_count > 0 {
            report.seeds_with_cycles += 1;
        }

        if replay.oracle.passed {
            report.seeds_passed += 1;
            continue;
        }

        warn!(seed, violations = replay.oracle.violations.len(), "seed failed");
        report.first_failure.get_or_insert(seed);
        report.failures.push(SeedFailure {
            seed,
            violations: replay.oracle.violations.iter().map(format_violation).collect(),
        });
    }

    info!(
        seeds = report.seeds_run,
        passed = report.seeds_passed,
        exceptions = report.partition_exceptions,
        "campaign complete"
    );
    Ok(report)
}

/// Run one seed; the inner result separates pass from invariant failures.
///
/// # Errors
///
/// Returns an error if the generated rows fail to resolve.
pub fn run_single_seed(
    seed: u64,
    config: &CampaignConfig,
) -> Result<std::result::Result<(), Vec<InvariantViolation>>> {
    let replay = replay_seed(seed, config)?;
    if replay.oracle.passed {
        Ok(Ok(()))
    } else {
        Ok(Err(replay.oracle.violations))
    }
}

/// Regenerate and resolve one seed, keeping rows and resolution.
///
/// # Errors
///
/// Returns an error if the generated rows fail to resolve.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<SeedReplay> {
    let rows = generate_rows(&config.scenario_for_seed(seed));
    let resolve_config = config.resolve_config();
    let resolution = resolve(&rows, &resolve_config)
        .with_context(|| format!("seed {seed} failed to resolve"))?;
    let oracle = InvariantOracle::check_all(&rows, &resolve_config, &resolution);

    debug!(seed, rows = rows.len(), clusters = resolution.clusters.len(), "seed checked");
    Ok(SeedReplay {
        rows,
        resolution,
        oracle,
    })
}

/// One-line description of a violation.
#[must_use]
pub fn format_violation(v: &InvariantViolation) -> String {
    match v {
        InvariantViolation::TerminalNotParent { site } => {
            format!("TerminalNotParent: {site} has no redirect but is not a parent")
        }
        InvariantViolation::NearestNotFixedPoint { site, nearest } => {
            format!("NearestNotFixedPoint: {site} resolves to {nearest}, which is not a fixed point")
        }
        InvariantViolation::RelationMismatch {
            site,
            indexed,
            walked,
        } => format!("RelationMismatch: {site} indexed={indexed:?} walked={walked:?}"),
        InvariantViolation::UnexpectedUnassigned { site } => {
            format!("UnexpectedUnassigned: {site} is in no cluster")
        }
        InvariantViolation::Duplicated { site } => {
            format!("Duplicated: {site} is in several clusters")
        }
        InvariantViolation::GenericMismatch {
            parent,
            cluster_generic,
            members_generic,
            related_generic,
        } => format!(
            "GenericMismatch: cluster {parent} generic={cluster_generic} \
             (members={members_generic}, related={related_generic})"
        ),
        InvariantViolation::NonIdempotent { detail } => format!("NonIdempotent: {detail}"),
    }
}
