//! # Pilot
//!
//! Runs the platform engine against the simulated differential base and
//! drives it around a demonstration path. The run ends when the path is
//! complete, when the base blocks, after `--cycles` cycles, or on Ctrl-C.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use clap::Parser;
use pilot_common::config::LogLevel;
use pilot_common::geometry::Pose;
use pilot_common::motion::{ControlMode, PilotConfig, PoseStatus};
use pilot_control::config::{load_config, platform_engine};
use pilot_control::cycle::{CycleConfig, EngineTask};
use pilot_control::engine::{EngineHandle, JsonLinesTelemetry, LogTelemetry, TelemetryPublisher};
use pilot_control::sim::{SimulatedBase, WaypointQueue};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the telemetry thread empties the snapshot queue.
const TELEMETRY_DRAIN_PERIOD: Duration = Duration::from_millis(20);

/// Pilot: mobile-robot motion control on a simulated base
#[derive(Parser, Debug)]
#[command(name = "pilot")]
#[command(version)]
#[command(about = "Periodic motion-control engine driven on a simulated base")]
struct Args {
    /// Path to the pilot configuration TOML. Built-in defaults when absent.
    config: Option<PathBuf>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// CPU core to pin the cycle thread to (enables RT setup).
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority used with --cpu-core.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Write telemetry snapshots as JSON lines to this file instead of the log.
    #[arg(long, value_name = "FILE")]
    telemetry: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path),
        None => Ok(PilotConfig::default()),
    };
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Pilot v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Pilot shutdown complete");
}

fn run(args: &Args, config: &PilotConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, cycle_time={}µs, motors={}",
        config.shared.service_name,
        config.cycle_time_us,
        config.motors.len(),
    );

    let base = SimulatedBase::new(config.platform.drive, config.cycle_time_s());
    let path = WaypointQueue::path(demo_path());

    let publisher = match &args.telemetry {
        Some(file) => {
            TelemetryPublisher::new(JsonLinesTelemetry::new(BufWriter::new(File::create(file)?)))
        }
        None => TelemetryPublisher::new(LogTelemetry::new(config.shared.service_name.clone())),
    };
    let builder = platform_engine(config, base.odometer(), base.actuators())
        .target_source(path.clone())
        .telemetry(publisher.queue(), config.telemetry_interval);
    let handle = EngineHandle::new(builder.build()?);
    let telemetry = publisher.spawn(TELEMETRY_DRAIN_PERIOD)?;
    debug!("controller tree:\n{}", handle.tree_dump());

    handle.enable()?;

    let task = EngineTask::spawn(
        handle.clone(),
        CycleConfig {
            cpu_core: args.cpu_core,
            rt_priority: args.rt_priority,
            max_cycles: args.cycles,
            ..CycleConfig::from(config)
        },
    )?;

    let stop = task.stop_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.store(true, Ordering::SeqCst);
    })?;

    while !task.is_finished() {
        if path.is_empty() && handle.pose_status() == PoseStatus::Reached {
            info!("Path complete after {} cycles", handle.current_cycle());
            task.stop();
        } else if handle.mode() == ControlMode::Blocked {
            warn!("Platform blocked, stopping");
            task.stop();
        }
        thread::sleep(Duration::from_millis(50));
    }

    let stats = task.join();
    handle.disable();
    let publisher = telemetry.join()?;
    debug!(
        published = publisher.published(),
        failed = publisher.failed(),
        "telemetry flushed"
    );

    let pose = base.pose();
    info!(
        "Final pose: x={:.1} y={:.1} orientation={:.1}",
        pose.x(),
        pose.y(),
        pose.orientation()
    );

    let stats = stats?;
    info!(
        "Cycles: {} (avg {} ns, max {} ns, overruns {})",
        stats.cycle_count,
        stats.avg_cycle_ns(),
        stats.max_cycle_ns,
        stats.overruns
    );
    Ok(())
}

/// Square of 500 mm, ending back on the origin facing the start heading.
fn demo_path() -> [Pose; 4] {
    [
        Pose::new(500.0, 0.0, 90.0),
        Pose::new(500.0, 500.0, 180.0),
        Pose::new(0.0, 500.0, -90.0),
        Pose::new(0.0, 0.0, 0.0),
    ]
}

/// Setup tracing subscriber from CLI arguments and the configured level.
///
/// `RUST_LOG` takes precedence over both.
fn setup_tracing(args: &Args, level: LogLevel) {
    let default = if args.verbose {
        LogLevel::Debug
    } else {
        level
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default.as_filter()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
