//! Commands that read and write a PAMM state file

use anyhow::{Context, Result};
use colored::Colorize;
use pamm_adapters::{load_record, save_record};
use pamm_model::{Fp, Pamm};
use std::path::Path;

use crate::config::CliConfig;

pub fn init_state(
    config: &CliConfig,
    path: &Path,
    x: Fp,
    b: Fp,
    y: Fp,
    force: bool,
) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "State file already exists: {}\nPass --force to overwrite it",
            path.display()
        );
    }
    let pamm = config.pamm_at(x, b, y)?;
    save_record(path, &pamm.record())
        .with_context(|| format!("Failed to write state file: {}", path.display()))?;

    println!("{}", "=== Initialize PAMM State ===".bright_green().bold());
    println!("{} {}", "State file:".bright_cyan(), path.display());
    println!("{} {}", "Redemption level (x):".bright_cyan(), x);
    println!("{} {}", "Supply (y):".bright_cyan(), y);
    println!("{} {}", "Reserve (b):".bright_cyan(), b);
    println!("{} {}", "Region:".bright_cyan(), pamm.current_region()?);
    Ok(())
}

/// Apply a redemption to the state file in place; returns the value paid.
pub fn redeem_state(config: &CliConfig, path: &Path, amount: Fp) -> Result<Fp> {
    let record = load_record(path)
        .with_context(|| format!("Failed to load state file: {}", path.display()))?;
    // Parameters come from the record; the tolerance from the active config
    let mut pamm = Pamm::from_record(&record)?.with_region_tolerance(config.region_tolerance)?;
    let before = pamm.state();
    let region = pamm.current_region()?;
    let value = pamm.apply_redeem(amount)?;
    save_record(path, &pamm.record())
        .with_context(|| format!("Failed to write state file: {}", path.display()))?;

    let after = pamm.state();
    log::info!("redeemed {} for {} from {}", amount, value, path.display());
    println!("{}", "=== Redeem ===".bright_green().bold());
    println!("{} {}", "State file:".bright_cyan(), path.display());
    println!("{} {}", "Region:".bright_cyan(), region);
    println!("{} {}", "Amount:".bright_cyan(), amount);
    println!("{} {}", "Value paid:".bright_cyan(), value.to_string().bold());
    println!("\n{:<8} {:>24} {:>24}", "", "before", "after");
    for (label, old, new) in [
        ("x", before.x, after.x),
        ("y", before.y, after.y),
        ("b", before.b, after.b),
    ] {
        println!("{:<8} {:>24} {:>24}", label.bright_cyan(), old.to_string(), new.to_string());
    }
    println!("\n{} {}", "Success!".bright_green().bold(), "✓".bright_green());
    Ok(value)
}
