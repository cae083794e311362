#![forbid(unsafe_code)]

use anyhow::Result;
use orgroot_sim::{CampaignConfig, run_campaign};

fn main() -> Result<()> {
    let report = run_campaign(&CampaignConfig::default())?;

    println!(
        "campaign complete: seeds={} passed={} cycles={} exceptions={}",
        report.seeds_run, report.seeds_passed, report.seeds_with_cycles, report.partition_exceptions
    );
    if let Some(seed) = report.first_failure {
        println!("{}", serde_json::to_string_pretty(&report.failures)?);
        anyhow::bail!("seed {seed} violated an invariant");
    }

    Ok(())
}
