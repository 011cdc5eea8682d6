//! rackwire CLI Client
//!
//! Command-line interface for querying a mobile-racking controller.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rackwire::{Config, FieldLayout, MobileRackingSession, RackError, StatusFrame};
use tracing_subscriber::{fmt, EnvFilter};

/// rackwire CLI
#[derive(Parser, Debug)]
#[command(name = "rackwire-cli")]
#[command(about = "Query and command a mobile-racking controller")]
#[command(version)]
struct Args {
    /// Controller address (host:port)
    #[arg(short, long, default_value = "1.1.1.2:2000")]
    addr: String,

    /// Response timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "10000")]
    connect_timeout_ms: u64,

    /// Built-in status word layout (stow, wms)
    #[arg(short, long, default_value = "stow")]
    layout: String,

    /// JSON layout file, overrides --layout
    #[arg(long)]
    layout_file: Option<String>,

    /// Print status frames as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Request the controller status
    Status,

    /// Open an aisle (1..=19)
    Open {
        /// The aisle to open
        aisle: u16,
    },

    /// Poll the status repeatedly
    Watch {
        /// Delay between requests in milliseconds
        #[arg(short, long, default_value = "1000")]
        interval_ms: u64,

        /// Stop after this many requests (0 = forever)
        #[arg(short, long, default_value = "0")]
        count: u64,
    },

    /// Print the active layout as JSON
    Layout,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rackwire=debug"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> rackwire::Result<()> {
    let layout = match &args.layout_file {
        Some(path) => FieldLayout::from_json_file(path)?,
        None => FieldLayout::preset(&args.layout).ok_or_else(|| {
            RackError::Config(format!("unknown layout '{}' (expected stow or wms)", args.layout))
        })?,
    };

    if let Commands::Layout = args.command {
        println!("{}", layout.to_json()?);
        return Ok(());
    }

    tracing::warn!(
        "Using status layout '{}'; confirm it against the controller documentation",
        layout.name
    );

    let config = Config::builder()
        .addr(&args.addr)
        .response_timeout_ms(args.timeout_ms)
        .connect_timeout_ms(args.connect_timeout_ms)
        .layout(layout)
        .build();

    tracing::info!("Connecting to {}", config.addr);
    let session = MobileRackingSession::open(config)?;
    tracing::info!("Connected to {:?}", session.peer_addr());

    let result = match args.command {
        Commands::Status => session
            .request_status()
            .and_then(|status| render(&status, args.json)),
        Commands::Open { aisle } => {
            tracing::info!("Opening aisle {}", aisle);
            session
                .open_aisle(aisle)
                .and_then(|status| render(&status, args.json))
        }
        Commands::Watch { interval_ms, count } => watch(&session, interval_ms, count, args.json),
        Commands::Layout => Ok(()),
    };

    session.close();
    result
}

fn watch(session: &MobileRackingSession, interval_ms: u64, count: u64, json: bool) -> rackwire::Result<()> {
    let mut polled = 0;
    while count == 0 || polled < count {
        match session.request_status() {
            Ok(status) => render(&status, json)?,
            Err(e) if e.is_recoverable() => tracing::warn!("Status request failed, retrying: {}", e),
            Err(e) => return Err(e),
        }
        polled += 1;
        thread::sleep(Duration::from_millis(interval_ms));
    }
    if session.discarded_bytes() > 0 {
        tracing::debug!("Discarded {} stale bytes", session.discarded_bytes());
    }
    Ok(())
}

fn render(status: &StatusFrame, json: bool) -> rackwire::Result<()> {
    tracing::debug!("Status frame: {}", status.to_hex());
    if json {
        println!("{}", serde_json::to_string(&status.snapshot())?);
    } else {
        println!("{}", status);
    }
    Ok(())
}
