//! rackwire Controller Simulator
//!
//! Serves the controller protocol locally for testing clients.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rackwire::network::{Behavior, Simulator};
use rackwire::{Field, FieldLayout};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Respond,
    Silent,
    Truncate,
    Delay,
}

/// Controller simulator
#[derive(Parser, Debug)]
#[command(name = "rackwire-sim")]
#[command(about = "Simulated mobile-racking controller")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:2000")]
    listen: String,

    /// Status word layout (stow, wms)
    #[arg(long, default_value = "stow")]
    layout: String,

    /// Number of mobiles reported
    #[arg(short, long, default_value = "4")]
    quantity: u16,

    /// Report power off
    #[arg(long)]
    power_off: bool,

    /// How commands are answered
    #[arg(short, long, value_enum, default_value = "respond")]
    mode: Mode,

    /// Bytes written in truncate mode
    #[arg(long, default_value = "12")]
    truncate_at: usize,

    /// Response delay in delay mode (milliseconds)
    #[arg(long, default_value = "500")]
    delay_ms: u64,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rackwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("rackwire simulator v{}", rackwire::VERSION);

    let Some(layout) = FieldLayout::preset(&args.layout) else {
        tracing::error!("Unknown layout '{}'", args.layout);
        return ExitCode::FAILURE;
    };

    let simulator = match Simulator::bind(&args.listen, layout) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start simulator: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let behavior = match args.mode {
        Mode::Respond => Behavior::Respond,
        Mode::Silent => Behavior::Silent,
        Mode::Truncate => Behavior::Truncate(args.truncate_at),
        Mode::Delay => Behavior::Delay(Duration::from_millis(args.delay_ms)),
    };

    let setup = simulator.handle().and_then(|handle| {
        handle.set_behavior(behavior);
        handle.set_field(Field::CanOpen, 1)?;
        handle.set_field(Field::PowerOn, u16::from(!args.power_off))?;
        handle.set_field(Field::AutomaticMode, 1)?;
        handle.set_field(Field::MobileQuantity, args.quantity)
    });
    if let Err(e) = setup {
        tracing::error!("Failed to configure simulator: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = simulator.run() {
        tracing::error!("Simulator error: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("Simulator stopped");
    ExitCode::SUCCESS
}
