//! label_once - run the detection pipeline on a single image
//!
//! Prints each detection with its final label, score and box, then the
//! formatted label string and stage timings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use label_beacon::{format_labels, BeaconConfig, DetectionPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image to label.
    #[arg(long, value_name = "PATH")]
    image: PathBuf,
    /// JSON config file (overrides LABEL_BEACON_CONFIG).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = BeaconConfig::load_from(args.config.as_deref())?;
    let mut pipeline = DetectionPipeline::load(&config.models, &config.pipeline)?;
    let image = image::open(&args.image)
        .with_context(|| format!("failed to decode {}", args.image.display()))?
        .into_rgb8();

    let run = pipeline.run_detailed(&image)?;
    for (detection, label) in run.detections.iter().zip(&run.labels) {
        let b = &detection.bbox;
        println!(
            "{:<24} {:.3}  [{:.1}, {:.1}, {:.1}, {:.1}]",
            label, detection.score, b.xmin, b.ymin, b.xmax, b.ymax
        );
    }
    println!("labels: {}", format_labels(&run.labels));
    println!(
        "localize: {:.1} ms, classify: {:.1} ms",
        run.localize_time.as_secs_f64() * 1000.0,
        run.classify_time.as_secs_f64() * 1000.0
    );
    Ok(())
}
