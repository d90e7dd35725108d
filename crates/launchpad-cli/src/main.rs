use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use launchpad_cli::{create_example_config, FeeConfig, LaunchpadConfig, Scenario, Simulation};
use launchpad_core::fees;
use launchpad_core::{CapabilitySet, Clock, ProtocolConfig, QuoteMode, SystemClock};
use solana_program::native_token::LAMPORTS_PER_SOL;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "launchpad")]
#[command(about = "Launchpad operator tooling: configuration, fee quotes and simulations")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an example configuration file
    InitConfig {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Quote the fee for a capability set
    Quote {
        /// Capabilities to enable, e.g. `marketing,community` or a raw mask
        #[arg(short, long, default_value = "none")]
        capabilities: CapabilitySet,

        /// Capabilities already purchased; quotes an upgrade instead of a launch
        #[arg(short, long)]
        existing: Option<CapabilitySet>,

        /// Take fee constants from this configuration instead of the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a scripted scenario on a simulated host and print events as JSON lines
    Simulate {
        /// Path to launchpad configuration file
        #[arg(short, long, default_value = "launchpad.toml")]
        config: PathBuf,

        /// Path to scenario script
        #[arg(short, long)]
        script: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig { path, force } => {
            init_logging("info", cli.verbose);
            init_config(&path, force)
        }
        Command::Quote {
            capabilities,
            existing,
            config,
        } => {
            init_logging("info", cli.verbose);
            quote(capabilities, existing, config.as_deref())
        }
        Command::Simulate { config, script } => {
            let config = LaunchpadConfig::load(&config)?;
            init_logging(&config.log_level, cli.verbose);
            simulate(config, &script)
        }
    }
}

fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("launchpad={},launchpad_core={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    create_example_config(path)?;
    info!("Wrote example configuration to {}", path.display());
    Ok(())
}

fn quote(
    capabilities: CapabilitySet,
    existing: Option<CapabilitySet>,
    config: Option<&Path>,
) -> Result<()> {
    let schedule = match config {
        Some(path) => LaunchpadConfig::load(path)?.fees.schedule(),
        None => FeeConfig::default().schedule(),
    };

    let (charged, mode) = match existing {
        Some(existing) => (CapabilitySet::added(existing, capabilities), QuoteMode::Incremental),
        None => (capabilities, QuoteMode::Initial),
    };
    let quote = fees::quote(&schedule, charged, mode)?;
    let total = quote.total()?;

    println!("Capabilities:  {}", capabilities);
    if existing.is_some() {
        println!("Newly charged: {}", charged);
    }
    println!("Platform fee:  {} lamports", quote.platform);
    println!("Agent fee:     {} lamports", quote.agent);
    println!(
        "Total:         {} lamports ({} SOL)",
        total,
        total as f64 / LAMPORTS_PER_SOL as f64
    );
    Ok(())
}

fn simulate(config: LaunchpadConfig, script: &Path) -> Result<()> {
    let scenario = Scenario::load(script)?;
    let start_time = scenario
        .start_time
        .unwrap_or_else(|| SystemClock.unix_timestamp());

    info!("Simulating {} steps from {}", scenario.steps.len(), script.display());
    info!("Authority: {}", config.authority);

    let protocol = ProtocolConfig::new(config.protocol_params())?;
    let mut simulation = Simulation::new(protocol, start_time);
    let reports = simulation.run(&scenario)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for report in &reports {
        for line in report.json_lines()? {
            writeln!(out, "{}", line)?;
        }
    }

    for (alias, pubkey) in simulation.aliases() {
        info!("{} = {}", alias, pubkey);
    }
    Ok(())
}
