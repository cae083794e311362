//! Seeded generation of redirect extracts.
//!
//! Sites are numbered `0..site_count`. A redirecting site either points
//! "forward" to a higher-numbered site, which can only build chains and
//! fan-in, or, with `cycle_percent`, to any site at all, which is how cycles,
//! self-redirects and tails into cycles appear. Row order is shuffled so the
//! construction order differs from the numbering.

use anyhow::{Result, bail};
use orgroot_core::RedirectRow;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;

/// Shape of one generated extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub site_count: usize,
    /// Chance that a site redirects at all (percent).
    pub redirect_percent: u8,
    /// Chance that a redirect may target any site, including earlier ones.
    pub cycle_percent: u8,
    /// Chance that a site is flagged generic.
    pub generic_percent: u8,
    /// Chance that a site's row is emitted a second time with fresh content.
    pub duplicate_percent: u8,
    pub shuffle_rows: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            site_count: 64,
            redirect_percent: 60,
            cycle_percent: 15,
            generic_percent: 10,
            duplicate_percent: 0,
            shuffle_rows: true,
        }
    }
}

impl ScenarioConfig {
    /// # Errors
    ///
    /// Returns an error if a percentage exceeds 100.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("redirect_percent", self.redirect_percent),
            ("cycle_percent", self.cycle_percent),
            ("generic_percent", self.generic_percent),
            ("duplicate_percent", self.duplicate_percent),
        ] {
            if value > 100 {
                bail!("{name} must be <= 100, got {value}");
            }
        }
        Ok(())
    }
}

/// Generate the rows for one scenario.
///
/// Every redirect target is among the generated ids, so the rows resolve
/// under either missing-reference policy.
#[must_use]
pub fn generate_rows(config: &ScenarioConfig) -> Vec<RedirectRow> {
    let mut rng = DeterministicRng::new(config.seed);
    let n = config.site_count;

    let mut rows: Vec<RedirectRow> = (0..n).map(|i| site_row(&mut rng, config, i)).collect();

    let mut duplicates = Vec::new();
    for i in 0..n {
        if rng.chance(config.duplicate_percent) {
            duplicates.push(site_row(&mut rng, config, i));
        }
    }

    if config.shuffle_rows {
        rng.shuffle(&mut rows);
    }
    rows.extend(duplicates);
    rows
}

fn site_row(rng: &mut DeterministicRng, config: &ScenarioConfig, i: usize) -> RedirectRow {
    let n = config.site_count;
    let generic = rng.chance(config.generic_percent);
    let id = site_id(i);
    let name = site_name(i);

    if !rng.chance(config.redirect_percent) {
        return RedirectRow::terminal(id, name, generic);
    }

    let target = if rng.chance(config.cycle_percent) {
        Some(rng.index(n))
    } else if i + 1 < n {
        Some(i + 1 + rng.index(n - i - 1))
    } else {
        None
    };

    match target {
        Some(t) => RedirectRow::redirecting(id, name, generic, site_id(t), site_name(t)),
        None => RedirectRow::terminal(id, name, generic),
    }
}

fn site_id(i: usize) -> String {
    format!("site-{i:05}")
}

fn site_name(i: usize) -> String {
    format!("org{i}.example")
}

/// Proptest strategy over small scenario configs.
pub fn arb_scenario_config() -> impl Strategy<Value = ScenarioConfig> {
    (
        any::<u64>(),
        0_usize..48,
        0_u8..=100,
        0_u8..=100,
        0_u8..=100,
        0_u8..=30,
        any::<bool>(),
    )
        .prop_map(
            |(seed, site_count, redirect, cycle, generic, duplicate, shuffle_rows)| {
                ScenarioConfig {
                    seed,
                    site_count,
                    redirect_percent: redirect,
                    cycle_percent: cycle,
                    generic_percent: generic,
                    duplicate_percent: duplicate,
                    shuffle_rows,
                }
            },
        )
}
