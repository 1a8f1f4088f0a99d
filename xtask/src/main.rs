//! Build automation tasks for IMGXFER
//!
//! Run with: cargo xtask <command>

use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "IMGXFER build automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all tests
    Test,

    /// Run clippy lints
    Lint,

    /// Check formatting
    Fmt,

    /// Run all CI checks
    Ci,

    /// Run the receive benchmarks
    Bench,

    /// Fuzz a target (requires cargo-fuzz and a nightly toolchain)
    Fuzz {
        /// Fuzz target name
        #[arg(default_value = "fuzz_ticket_parse")]
        target: String,

        /// Maximum run time in seconds
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },

    /// Generate documentation
    Doc,
}

const TEST: &[&str] = &["test", "--workspace"];
const LINT: &[&str] = &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"];
const FMT: &[&str] = &["fmt", "--all", "--check"];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test => run_cargo(TEST)?,
        Commands::Lint => run_cargo(LINT)?,
        Commands::Fmt => run_cargo(FMT)?,
        Commands::Ci => {
            println!("Running CI checks...");
            for args in [FMT, LINT, TEST] {
                run_cargo(args)?;
            }
            println!("All CI checks passed!");
        }
        Commands::Bench => run_cargo(&["bench", "-p", "imgxfer-files"])?,
        Commands::Fuzz { target, seconds } => {
            let max_time = format!("-max_total_time={seconds}");
            run_cargo(&["+nightly", "fuzz", "run", &target, "--", &max_time])?;
        }
        Commands::Doc => run_cargo(&["doc", "--workspace", "--no-deps", "--open"])?,
    }

    Ok(())
}

fn run_cargo(args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("cargo").args(args).status()?;

    if !status.success() {
        anyhow::bail!("cargo {} failed", args.join(" "));
    }

    Ok(())
}
