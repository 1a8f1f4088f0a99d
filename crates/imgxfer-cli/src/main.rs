//! IMGXFER CLI
//!
//! Receive benchmark and ticket helpers for the image transfer engine.

mod config;
mod progress;

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgxfer_auth::{Mode, Operation, Registry, Ticket};
use imgxfer_files::{Progress, Receiver};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use config::Config;
use progress::{ProgressIndicator, format_bytes, format_duration, format_speed};

const MIB: u64 = 1024 * 1024;

/// IMGXFER - ticket authorized direct I/O image transfer
#[derive(Parser)]
#[command(name = "imgxfer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive SIZE MiB from stdin into an existing file
    Recv {
        /// Target file
        path: PathBuf,

        /// Number of MiB to receive
        size: u64,

        /// Offset in the target file (in MiB)
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Show copy progress
        #[arg(long)]
        progress: bool,
    },

    /// Ticket helpers
    Ticket {
        #[command(subcommand)]
        command: TicketCommands,
    },
}

#[derive(Subcommand)]
enum TicketCommands {
    /// Print a new ticket with a random uuid
    New {
        /// Target url (file:///path)
        #[arg(long)]
        url: String,

        /// Maximum transfer size in bytes
        #[arg(long)]
        size: u64,

        /// Access mode: r, w or rw
        #[arg(long, default_value = "rw")]
        mode: String,

        /// Validity in seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Activate a ticket file and check an operation against it
    Check {
        /// Ticket JSON file
        file: PathBuf,

        /// Check a write instead of a read
        #[arg(long)]
        write: bool,

        /// Requested size in bytes (defaults to the ticket size)
        #[arg(long)]
        size: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?;
    config.validate()?;

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Recv {
            path,
            size,
            offset,
            progress,
        } => recv_file(&path, size, offset, progress, &config),
        Commands::Ticket { command } => match command {
            TicketCommands::New {
                url,
                size,
                mode,
                timeout,
            } => new_ticket(url, size, &mode, timeout),
            TicketCommands::Check { file, write, size } => check_ticket(&file, write, size),
        },
    }
}

/// Receive data from stdin into `path`
fn recv_file(
    path: &Path,
    size_mib: u64,
    offset_mib: u64,
    show_progress: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let size = size_mib.checked_mul(MIB).context("size is too large")?;
    let offset = offset_mib.checked_mul(MIB).context("offset is too large")?;

    tracing::info!(
        "Receiving {} to {} at offset {}",
        format_bytes(size),
        path.display(),
        format_bytes(offset)
    );

    let mut receiver = Receiver::new(config.receive_options())?;
    let mut stdin = io::stdin().lock();
    let start = Instant::now();

    let result = if show_progress {
        let mut indicator = ProgressIndicator::new(size, Duration::from_millis(100));
        indicator.start();
        let result = receiver.receive(
            path,
            &mut stdin,
            size,
            offset,
            Some(&indicator as &dyn Progress),
        );
        match &result {
            Ok(_) => indicator.finish_with_message("done".to_string()),
            Err(_) => indicator.abandon(),
        }
        result
    } else {
        receiver.receive(path, &mut stdin, size, offset, None)
    };

    let received = result.with_context(|| format!("receiving to {}", path.display()))?;
    let elapsed = start.elapsed();
    eprintln!(
        "Received {} in {} ({})",
        format_bytes(received),
        format_duration(elapsed),
        format_speed(received as f64 / elapsed.as_secs_f64().max(f64::EPSILON))
    );

    Ok(())
}

/// Print a new ticket as JSON
fn new_ticket(url: String, size: u64, mode: &str, timeout: u64) -> anyhow::Result<()> {
    let mode: Mode = mode.parse()?;
    let uuid = imgxfer_auth::uuid::uuid4().map_err(|e| anyhow::anyhow!("uuid: {e}"))?;
    let ticket = Ticket::new(mode, size, url, uuid, timeout)?;

    println!("{}", ticket.to_json()?);
    Ok(())
}

/// Activate the ticket in `file` and check an operation against it
fn check_ticket(file: &Path, write: bool, size: Option<u64>) -> anyhow::Result<()> {
    let buf = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let ticket = Ticket::parse(&buf)?;
    let uuid = ticket.uuid().to_string();
    let size = size.unwrap_or(ticket.size());

    let registry = Registry::new();
    registry.activate(ticket)?;

    let op = if write {
        Operation::Write
    } else {
        Operation::Read
    };
    let url = registry.check(&uuid, op, size)?;
    let auth = registry.lookup(&uuid)?;

    println!("Ticket:  {uuid}");
    println!("Mode:    {}", auth.ticket().mode());
    println!("Size:    {}", format_bytes(auth.ticket().size()));
    println!("Expires: in {}", format_duration(auth.remaining()));
    println!("Allowed: {op:?} of {} to {}", format_bytes(size), url.path());

    Ok(())
}
