use anyhow::Context;
use clap::Parser;
use movie_booking::{load_state, AppConfig, BookingLedger, LedgerSettings};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod menu;

use menu::Menu;

#[derive(Parser, Debug)]
#[command(name = "booking-cli")]
#[command(about = "Interactive movie ticket booking")]
struct Args {
    /// Properties file with booking settings
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Directory holding movies, showtimes and bookings
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Directory tickets are written to
    #[arg(long = "ticket-dir")]
    ticket_dir: Option<PathBuf>,

    /// Directory backups are written to
    #[arg(long = "backup-dir")]
    backup_dir: Option<PathBuf>,

    /// Minutes before a showtime after which bookings can no longer be cancelled
    #[arg(long = "cancellation-window")]
    cancellation_window: Option<i64>,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the menu
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    info!("Data directory: {:?}", config.data_dir);
    info!("Ticket directory: {:?}", config.ticket_dir);

    let state = load_state(&config.data_dir)
        .with_context(|| format!("failed to load state from {:?}", config.data_dir))?;
    let ledger = BookingLedger::from_state(state, LedgerSettings::from(&config))?;
    ledger.ensure_seat_maps();

    fs::create_dir_all(&config.ticket_dir)
        .with_context(|| format!("failed to create {:?}", config.ticket_dir))?;
    fs::create_dir_all(&config.backup_dir)
        .with_context(|| format!("failed to create {:?}", config.backup_dir))?;

    let stdin = io::stdin();
    let mut menu = Menu::new(ledger, config, stdin.lock(), io::stdout());
    menu.run()
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config =
        AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    // Command line flags win over file and environment
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(ticket_dir) = &args.ticket_dir {
        config.ticket_dir = ticket_dir.clone();
    }
    if let Some(backup_dir) = &args.backup_dir {
        config.backup_dir = backup_dir.clone();
    }
    if let Some(window) = args.cancellation_window {
        config.cancellation_window_min = window;
    }
    config.validate()?;

    Ok(config)
}
