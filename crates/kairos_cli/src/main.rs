//! Kairos CLI, the command-line driver for timing-driven pipeline rebalancing.
//!
//! Provides `kairos inspect` for reading STA reports against a netlist,
//! `kairos step` for a single rebalancing iteration, and `kairos run` for the
//! full synthesize/rebalance loop with clock-period sweeping.

#![warn(missing_docs)]

mod inspect;
mod pipeline;
mod run;
mod step;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kairos_config::SidePolicy;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the log filter chosen from flags.
const LOG_ENV: &str = "KAIROS_LOG";

/// Kairos: moves pipeline stages until timing closes.
#[derive(Parser, Debug)]
#[command(name = "kairos", version, about = "Timing-driven pipeline stage rebalancing")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a custom `kairos.toml` configuration file or its directory.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the deduplicated path table of one or more STA reports.
    Inspect(InspectArgs),
    /// Run a single rebalancing iteration on existing STA artifacts.
    Step(StepArgs),
    /// Run the full synthesize/rebalance loop.
    Run(RunArgs),
}

/// Arguments for the `kairos inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// STA report files (e.g. max and min).
    #[arg(short, long = "report", required = true, num_args = 1..)]
    pub reports: Vec<String>,

    /// Structural netlist JSON.
    #[arg(short, long)]
    pub netlist: String,

    /// Top module name (default: from `kairos.toml`).
    #[arg(long)]
    pub top: Option<String>,

    /// Consolidated STA metrics JSON to summarize per corner.
    #[arg(short, long)]
    pub metrics: Option<String>,
}

/// Arguments for the `kairos step` subcommand.
#[derive(Parser, Debug)]
pub struct StepArgs {
    /// STA report files (default: the configured reports).
    #[arg(short, long = "report", num_args = 1..)]
    pub reports: Vec<String>,

    /// Structural netlist JSON (default: the configured netlist).
    #[arg(short, long)]
    pub netlist: Option<String>,

    /// Override the configured side-selection policy.
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Log decisions without patching any source.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `kairos run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Override the starting clock period (e.g. "4.7ns").
    #[arg(long)]
    pub clock_period: Option<String>,

    /// Override the per-attempt iteration budget.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Sweep the clock period when an attempt stops converging.
    #[arg(long)]
    pub increase_clock: bool,

    /// Override the configured side-selection policy.
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

/// Side-selection policy for register-to-register paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Move the side whose neighbouring paths have more slack.
    SlackComparison,
    /// Always try the start side first.
    NoSlackAssumption,
    /// Slack comparison, with a coin flip on repeated pairs.
    RandomTiebreak,
}

impl From<PolicyArg> for SidePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::SlackComparison => SidePolicy::SlackComparison,
            PolicyArg::NoSlackAssumption => SidePolicy::NoSlackAssumption,
            PolicyArg::RandomTiebreak => SidePolicy::RandomTiebreak,
        }
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Log verbosity level.
    pub verbose: u8,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Step(ref args) => step::run(args, &global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Default log filter for the given flags.
fn log_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        return "error";
    }
    match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(global: &GlobalArgs) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(log_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
