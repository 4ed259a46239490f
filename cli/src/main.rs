//! PAMM CLI - inspect and exercise the redemption pricing engine
//!
//! Classifies states into curve regions, reconstructs anchors, quotes and
//! applies redemptions against a JSON state file, and tabulates the curve.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use pamm_model::Fp;
use std::path::PathBuf;

mod config;
mod curve;
mod inspect;
mod simulate;
mod state;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "pamm")]
#[command(about = "PAMM CLI - price stablecoin redemptions against the reserve", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults: alpha_bar 1.0, xu_bar 0.3, theta_bar 0.6)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Observed state `(x, b, y)`
#[derive(Args)]
struct StateArgs {
    /// Redemption level
    #[arg(long)]
    x: Fp,

    /// Reserve value
    #[arg(long)]
    b: Fp,

    /// Outstanding supply
    #[arg(long)]
    y: Fp,
}

#[derive(Subcommand)]
enum Commands {
    /// Show parameters and derived thresholds
    Params {
        /// Print as a config file instead
        #[arg(long)]
        toml: bool,
    },

    /// Classify a state into its curve region
    Region {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Reconstruct the anchor reserve of a state
    Anchor {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Marginal redemption price at a state
    Price {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Quote a redemption without changing anything
    Quote {
        #[command(flatten)]
        state: StateArgs,

        /// Stablecoin amount to redeem
        #[arg(long)]
        amount: Fp,
    },

    /// Create a state file
    Init {
        /// State file (JSON)
        #[arg(long)]
        state: PathBuf,

        #[arg(long, default_value = "0")]
        x: Fp,

        #[arg(long, default_value = "0")]
        b: Fp,

        #[arg(long, default_value = "0")]
        y: Fp,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Apply a redemption to a state file
    Redeem {
        /// State file (JSON)
        #[arg(long)]
        state: PathBuf,

        /// Stablecoin amount to redeem
        #[arg(long)]
        amount: Fp,
    },

    /// Tabulate reserve, price and region along the curve of an anchor
    Curve {
        /// Anchor reserve
        #[arg(long)]
        ba: Fp,

        /// Anchor supply
        #[arg(long, default_value = "1")]
        ya: Fp,

        /// Number of intervals over [0, ya]
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=curve::MAX_STEPS as i64))]
        steps: u32,
    },

    /// Redeem in equal chunks and compare with a single redemption
    Simulate {
        #[command(flatten)]
        state: StateArgs,

        /// Total amount to redeem
        #[arg(long)]
        amount: Fp,

        /// Number of chunks
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=simulate::MAX_CHUNKS as i64))]
        chunks: u32,
    },
}

fn expand(path: PathBuf) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = CliConfig::new(cli.config.as_deref())?;

    if cli.verbose {
        match &config.path {
            Some(path) => println!("{} {}", "Config:".bright_cyan(), path.display()),
            None => println!("{} {}", "Config:".bright_cyan(), "built-in defaults"),
        }
        println!(
            "{} ({}, {}, {})\n",
            "Params:".bright_cyan(),
            config.params.alpha_bar(),
            config.params.xu_bar(),
            config.params.theta_bar()
        );
    }

    match cli.command {
        Commands::Params { toml } => inspect::show_params(&config, toml)?,
        Commands::Region { state } => inspect::show_region(&config, state.x, state.b, state.y)?,
        Commands::Anchor { state } => inspect::show_anchor(&config, state.x, state.b, state.y)?,
        Commands::Price { state } => inspect::show_price(&config, state.x, state.b, state.y)?,
        Commands::Quote { state, amount } => {
            inspect::show_quote(&config, state.x, state.b, state.y, amount)?;
        }
        Commands::Init { state, x, b, y, force } => {
            state::init_state(&config, &expand(state), x, b, y, force)?;
        }
        Commands::Redeem { state, amount } => {
            state::redeem_state(&config, &expand(state), amount)?;
        }
        Commands::Curve { ba, ya, steps } => curve::show_curve(&config, ba, ya, steps)?,
        Commands::Simulate { state, amount, chunks } => {
            simulate::simulate(&config, state.x, state.b, state.y, amount, chunks)?;
        }
    }

    Ok(())
}
