//! Chunked redemption simulation

use anyhow::Result;
use colored::Colorize;
use pamm_model::{Fp, PammState, Region};

use crate::config::CliConfig;

/// Reserve drift between the chunked and single paths that still counts as
/// path independent (1e-15)
fn path_tolerance() -> Fp {
    Fp::from_raw(1_000)
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationStep {
    pub amount: Fp,
    pub value: Fp,
    pub region: Region,
    pub state: PammState,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub steps: Vec<SimulationStep>,
    pub total_value: Fp,
    pub single_value: Fp,
    pub final_state: PammState,
    pub single_state: PammState,
}

impl SimulationReport {
    /// `|b_chunked - b_single|`
    pub fn reserve_drift(&self) -> Result<Fp> {
        Ok(self.final_state.b.checked_sub(self.single_state.b)?.abs())
    }
}

/// Upper bound on `--chunks`
pub const MAX_CHUNKS: u32 = 10_000;

/// `chunks` equal pieces of `amount`; the last one takes the remainder.
pub fn chunk_sizes(amount: Fp, chunks: u32) -> Result<Vec<Fp>> {
    if chunks == 0 || chunks > MAX_CHUNKS {
        anyhow::bail!("--chunks must lie in 1..={MAX_CHUNKS}, got {chunks}");
    }
    let piece = amount.div_down(Fp::from_integer(i64::from(chunks)))?;
    let mut sizes = vec![piece; chunks as usize - 1];
    let spent = piece.mul_down(Fp::from_integer(i64::from(chunks - 1)))?;
    sizes.push(amount.checked_sub(spent)?);
    Ok(sizes)
}

pub fn run_simulation(
    config: &CliConfig,
    x: Fp,
    b: Fp,
    y: Fp,
    amount: Fp,
    chunks: u32,
) -> Result<SimulationReport> {
    let mut pamm = config.pamm_at(x, b, y)?;
    let mut single = pamm.clone();

    let mut steps = Vec::new();
    let mut total_value = Fp::zero();
    for piece in chunk_sizes(amount, chunks)? {
        let region = pamm.current_region()?;
        let value = pamm.apply_redeem(piece)?;
        total_value = total_value.checked_add(value)?;
        steps.push(SimulationStep {
            amount: piece,
            value,
            region,
            state: pamm.state(),
        });
    }
    let single_value = single.apply_redeem(amount)?;

    Ok(SimulationReport {
        steps,
        total_value,
        single_value,
        final_state: pamm.state(),
        single_state: single.state(),
    })
}

pub fn simulate(config: &CliConfig, x: Fp, b: Fp, y: Fp, amount: Fp, chunks: u32) -> Result<()> {
    let report = run_simulation(config, x, b, y, amount, chunks)?;

    println!("{}", "=== Chunked Redemption ===".bright_green().bold());
    println!("{} {}", "Amount:".bright_cyan(), amount);
    println!("{} {}", "Chunks:".bright_cyan(), chunks);
    println!(
        "\n{:>5} {:>24} {:>24} {:>24}  {}",
        "#".bold(),
        "value".bold(),
        "x".bold(),
        "b".bold(),
        "region".bold()
    );
    for (i, step) in report.steps.iter().enumerate() {
        println!(
            "{:>5} {:>24} {:>24} {:>24}  {}",
            i + 1,
            step.value.to_string(),
            step.state.x.to_string(),
            step.state.b.to_string(),
            step.region
        );
    }

    println!("\n{} {}", "Chunked total:".bright_cyan(), report.total_value);
    println!("{} {}", "Single redemption:".bright_cyan(), report.single_value);
    let drift = report.reserve_drift()?;
    println!("{} {}", "Reserve drift:".bright_cyan(), drift);
    if drift <= path_tolerance() {
        println!("{}", "Path independent".bright_green());
    } else {
        println!("{}", "Chunked path diverges from a single redemption".yellow());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fp {
        s.parse().unwrap()
    }

    #[test]
    fn test_chunk_sizes_sum_to_amount() {
        let sizes = chunk_sizes(fp("1"), 3).unwrap();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes[0], fp("0.333333333333333333"));
        assert_eq!(sizes[2], fp("0.333333333333333334"));
        let total = sizes.iter().fold(Fp::zero(), |acc, s| acc.checked_add(*s).unwrap());
        assert_eq!(total, fp("1"));

        assert_eq!(chunk_sizes(fp("0.5"), 1).unwrap(), vec![fp("0.5")]);
        assert!(chunk_sizes(fp("1"), 0).is_err());
        assert_eq!(chunk_sizes(fp("1"), MAX_CHUNKS).unwrap().len(), MAX_CHUNKS as usize);
        assert!(chunk_sizes(fp("1"), MAX_CHUNKS + 1).is_err());
        assert!(chunk_sizes(fp("1"), u32::MAX).is_err());
    }

    #[test]
    fn test_flat_branch_is_path_independent() {
        let config = CliConfig::new(None).unwrap();
        let report = run_simulation(&config, Fp::zero(), fp("1.1"), fp("1"), fp("0.2"), 2).unwrap();
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.total_value, fp("0.2"));
        assert_eq!(report.single_value, fp("0.2"));
        assert_eq!(report.final_state, report.single_state);
        assert!(report.reserve_drift().unwrap().is_zero());
    }

    #[test]
    fn test_curve_path_stays_close_to_a_single_redemption() {
        let config = CliConfig::new(None).unwrap();
        let report =
            run_simulation(&config, fp("0.3"), fp("0.43125"), fp("0.7"), fp("0.1"), 4).unwrap();
        assert_eq!(report.single_value, fp("0.07"));
        assert_eq!(report.final_state.x, fp("0.4"));
        assert!(report.reserve_drift().unwrap() <= path_tolerance());
        simulate(&config, fp("0.3"), fp("0.43125"), fp("0.7"), fp("0.1"), 4).unwrap();
    }
}
