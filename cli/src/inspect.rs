//! Read-only commands: parameters, regions, anchors, prices and quotes

use anyhow::{Context, Result};
use colored::Colorize;
use pamm_model::curve::curve_shape;
use pamm_model::{Fp, Pamm};

use crate::config::CliConfig;

pub fn show_params(config: &CliConfig, as_toml: bool) -> Result<()> {
    if as_toml {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let params = &config.params;
    println!("{}", "=== PAMM Parameters ===".bright_green().bold());
    println!("{} {}", "Decay slope lower bound (alpha_bar):".bright_cyan(), params.alpha_bar());
    println!("{} {}", "Par threshold upper bound (xu_bar):".bright_cyan(), params.xu_bar());
    println!("{} {}", "Reserve ratio floor (theta_bar):".bright_cyan(), params.theta_bar());
    println!("{} {}", "Outflow memory:".bright_cyan(), config.outflow_memory);
    println!("{} {}", "Region tolerance:".bright_cyan(), config.region_tolerance);

    let derived = config.pamm_at(Fp::zero(), Fp::zero(), Fp::zero())?.derived_params()?;
    println!("\n{}", "=== Derived Thresholds (y_a = 1) ===".bright_green().bold());
    let rows = [
        ("Anchor I/II:", derived.anchor_i_ii),
        ("Anchor II/III:", derived.anchor_ii_iii),
        ("Lower threshold I/II:", derived.lower_i_ii),
        ("Lower threshold II/III:", derived.lower_ii_iii),
        ("Anchor II h/l:", derived.anchor_ii_hl),
        ("Upper threshold II h/l:", derived.upper_ii_hl),
        ("Lower threshold II h/l:", derived.lower_ii_hl),
        ("Anchor III H/L:", derived.anchor_iii_hl),
        ("Slope III H/L:", derived.slope_iii_hl),
        ("Lower threshold III H/L:", derived.lower_iii_hl),
    ];
    for (label, value) in rows {
        println!("{} {}", label.bright_cyan(), value);
    }
    Ok(())
}

fn print_state(pamm: &Pamm) {
    let state = pamm.state();
    println!("{} {}", "Redemption level (x):".bright_cyan(), state.x);
    println!("{} {}", "Supply (y):".bright_cyan(), state.y);
    println!("{} {}", "Reserve (b):".bright_cyan(), state.b);
}

pub fn show_region(config: &CliConfig, x: Fp, b: Fp, y: Fp) -> Result<()> {
    let pamm = config.pamm_at(x, b, y)?;
    println!("{}", "=== Region ===".bright_green().bold());
    print_state(&pamm);
    if y.is_positive() {
        println!("{} {}", "Reserve ratio:".bright_cyan(), pamm.reserve_ratio()?);
    }
    let region = pamm.current_region()?;
    println!("{} {} (code {})", "Region:".bright_cyan(), region.to_string().bold(), region.code());
    Ok(())
}

pub fn show_anchor(config: &CliConfig, x: Fp, b: Fp, y: Fp) -> Result<()> {
    let pamm = config.pamm_at(x, b, y)?;
    println!("{}", "=== Anchor ===".bright_green().bold());
    print_state(&pamm);
    println!("{} {}", "Region:".bright_cyan(), pamm.current_region()?);

    let ya = pamm.anchor_supply()?;
    println!("{} {}", "Anchor supply:".bright_cyan(), ya);
    let Some(anchor) = pamm.anchor_reserve()? else {
        println!(
            "\n{}",
            "Reserve ratio is at or below the floor; the anchor is not recoverable".yellow()
        );
        return Ok(());
    };
    println!("{} {}", "Anchor reserve:".bright_cyan(), anchor.to_string().bold());

    match curve_shape(anchor, ya, &config.params)? {
        Some(shape) => {
            println!("{} {}", "Decay slope:".bright_cyan(), shape.alpha);
            println!("{} {}", "Upper threshold:".bright_cyan(), shape.xu);
            println!("{} {}", "Lower threshold:".bright_cyan(), shape.xl);
            println!("{} {}", "Floor ratio:".bright_cyan(), shape.floor_ratio()?);
        }
        None => println!("{}", "Flat curve: redemptions pay par".dimmed()),
    }
    Ok(())
}

pub fn show_price(config: &CliConfig, x: Fp, b: Fp, y: Fp) -> Result<()> {
    let pamm = config.pamm_at(x, b, y)?;
    println!("{}", "=== Spot Price ===".bright_green().bold());
    print_state(&pamm);
    println!("{} {}", "Region:".bright_cyan(), pamm.current_region()?);
    println!("{} {}", "Price:".bright_cyan(), pamm.spot_price()?.to_string().bold());
    Ok(())
}

pub fn show_quote(config: &CliConfig, x: Fp, b: Fp, y: Fp, amount: Fp) -> Result<()> {
    let pamm = config.pamm_at(x, b, y)?;
    let value = pamm
        .quote_redeem(amount)
        .with_context(|| format!("Failed to quote a redemption of {amount}"))?;

    println!("{}", "=== Redemption Quote ===".bright_green().bold());
    print_state(&pamm);
    println!("{} {}", "Region:".bright_cyan(), pamm.current_region()?);
    println!("{} {}", "Amount:".bright_cyan(), amount);
    println!("{} {}", "Value paid:".bright_cyan(), value.to_string().bold());
    if amount.is_positive() {
        println!("{} {}", "Average price:".bright_cyan(), value.div_down(amount)?);
    }
    if value < amount {
        println!("{}", "Redemption is below par".yellow());
    }
    Ok(())
}
