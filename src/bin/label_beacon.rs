//! label_beacon - sign-labelling daemon
//!
//! This daemon:
//! 1. Loads configuration, label tables and both models
//! 2. Opens the frame source
//! 3. Starts the scheduler idle, waiting for a consumer
//! 4. Notifies the consumer with labels while it is subscribed
//!
//! Without a radio transport attached, `--subscribe` attaches a console
//! consumer so labels are printed to stdout.

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use label_beacon::{
    open_source, transport, AddressCharacteristic, BeaconConfig, ConsoleNotifier,
    DetectionPipeline, LabelCharacteristic, LabelJob, PeriodicScheduler, ResultLog,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (overrides LABEL_BEACON_CONFIG).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Frame source: image directory, /dev/videoN, or stub://name.
    #[arg(long)]
    source: Option<String>,
    /// Scheduler interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Subscribe a console consumer immediately.
    #[arg(long)]
    subscribe: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = BeaconConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval = Duration::from_millis(interval_ms);
    }

    let pipeline = DetectionPipeline::load(&config.models, &config.pipeline)
        .context("failed to load detection pipeline")?;
    let source = open_source(&config.source)?;
    log::info!("frame source: {}", source.describe());

    let mut job = LabelJob::new(source, pipeline);
    if let Some(dir) = &config.results_dir {
        let results = ResultLog::open(dir)?;
        log::info!("recording results to {}", results.path().display());
        job = job.with_results(results);
    }

    let scheduler = Arc::new(PeriodicScheduler::new(config.interval));
    scheduler.start(move || job.tick())?;
    log::info!("scheduler idle, tick interval {:?}", scheduler.interval());

    let address = AddressCharacteristic;
    let labels = LabelCharacteristic::new(scheduler.clone());
    log::info!(
        "advertising {} (service {}): address characteristic {} = {}, label characteristic {}",
        transport::DEVICE_NAME,
        transport::SERVICE_UUID,
        address.uuid(),
        String::from_utf8_lossy(&address.on_read()),
        labels.uuid()
    );

    let console = Arc::new(ConsoleNotifier::new());
    if args.subscribe {
        labels.on_subscribe(console.clone());
    }

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("error setting Ctrl-C handler")?;

    log::info!("label_beacon waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping scheduler...");
    labels.on_unsubscribe();
    scheduler.stop();

    let stats = scheduler.stats();
    log::info!(
        "scheduler ran {} of {} ticks, delivered {} results ({} printed to console)",
        stats.runs,
        stats.ticks,
        stats.deliveries,
        console.sent()
    );
    Ok(())
}
