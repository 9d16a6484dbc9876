use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_LOCALIZER_PATH: &str = "models/localizer.onnx";
const DEFAULT_LOCALIZER_CLASSES: &str = "models/classes.txt";
const DEFAULT_CLASSIFIER_PATH: &str = "models/classifier.onnx";
const DEFAULT_CLASSIFIER_LABELS: &str = "models/labels.csv";
const DEFAULT_SOURCE: &str = "images/";
const DEFAULT_INPUT_SIDE: u32 = 640;
const DEFAULT_CROP_SIDE: u32 = 100;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_CANDIDATE_LABEL: &str = "Traffic Sign";
const DEFAULT_INTERVAL_MS: u64 = 0;

pub const CONFIG_ENV: &str = "LABEL_BEACON_CONFIG";

#[derive(Debug, Deserialize, Default)]
struct BeaconConfigFile {
    models: Option<ModelsConfigFile>,
    pipeline: Option<PipelineConfigFile>,
    source: Option<String>,
    schedule: Option<ScheduleConfigFile>,
    results_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    localizer: Option<PathBuf>,
    localizer_classes: Option<PathBuf>,
    classifier: Option<PathBuf>,
    classifier_labels: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    input_side: Option<u32>,
    crop_side: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    candidate_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ScheduleConfigFile {
    interval_ms: Option<u64>,
}

/// Immutable detection parameters, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Side length of the square localizer input.
    pub input_side: u32,
    /// Side length of the square classifier input.
    pub crop_side: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Localizer class that is routed to the classifier.
    pub candidate_label: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_side: DEFAULT_INPUT_SIDE,
            crop_side: DEFAULT_CROP_SIDE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            candidate_label: DEFAULT_CANDIDATE_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPaths {
    pub localizer: PathBuf,
    pub localizer_classes: PathBuf,
    pub classifier: PathBuf,
    pub classifier_labels: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            localizer: PathBuf::from(DEFAULT_LOCALIZER_PATH),
            localizer_classes: PathBuf::from(DEFAULT_LOCALIZER_CLASSES),
            classifier: PathBuf::from(DEFAULT_CLASSIFIER_PATH),
            classifier_labels: PathBuf::from(DEFAULT_CLASSIFIER_LABELS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BeaconConfig {
    pub models: ModelPaths,
    pub pipeline: PipelineConfig,
    /// Frame source URI: an image directory, `stub://name`, or a camera device.
    pub source: String,
    /// Scheduler tick interval. Zero runs back-to-back while active.
    pub interval: Duration,
    pub results_dir: Option<PathBuf>,
}

impl BeaconConfig {
    /// Load from the file named by `LABEL_BEACON_CONFIG` (if set), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like `load`, but an explicit `path` takes precedence over the environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Some(read_config_file(&path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: BeaconConfigFile) -> Self {
        let defaults = ModelPaths::default();
        let models = file.models.unwrap_or_default();
        let models = ModelPaths {
            localizer: models.localizer.unwrap_or(defaults.localizer),
            localizer_classes: models
                .localizer_classes
                .unwrap_or(defaults.localizer_classes),
            classifier: models.classifier.unwrap_or(defaults.classifier),
            classifier_labels: models
                .classifier_labels
                .unwrap_or(defaults.classifier_labels),
        };

        let defaults = PipelineConfig::default();
        let pipeline = file.pipeline.unwrap_or_default();
        let pipeline = PipelineConfig {
            input_side: pipeline.input_side.unwrap_or(defaults.input_side),
            crop_side: pipeline.crop_side.unwrap_or(defaults.crop_side),
            confidence_threshold: pipeline
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: pipeline.iou_threshold.unwrap_or(defaults.iou_threshold),
            candidate_label: pipeline
                .candidate_label
                .unwrap_or(defaults.candidate_label),
        };

        let interval = Duration::from_millis(
            file.schedule
                .and_then(|schedule| schedule.interval_ms)
                .unwrap_or(DEFAULT_INTERVAL_MS),
        );

        Self {
            models,
            pipeline,
            source: file.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            interval,
            results_dir: file.results_dir,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("LABEL_BEACON_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(interval) = std::env::var("LABEL_BEACON_INTERVAL_MS") {
            let millis: u64 = interval.parse().map_err(|_| {
                anyhow!("LABEL_BEACON_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.interval = Duration::from_millis(millis);
        }
        if let Ok(threshold) = std::env::var("LABEL_BEACON_CONF_THRESHOLD") {
            self.pipeline.confidence_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LABEL_BEACON_CONF_THRESHOLD must be a number"))?;
        }
        if let Ok(threshold) = std::env::var("LABEL_BEACON_IOU_THRESHOLD") {
            self.pipeline.iou_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LABEL_BEACON_IOU_THRESHOLD must be a number"))?;
        }
        if let Ok(dir) = std::env::var("LABEL_BEACON_RESULTS_DIR") {
            if !dir.trim().is_empty() {
                self.results_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.source.trim().is_empty() {
            return Err(anyhow!("frame source must not be empty"));
        }
        Ok(())
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.input_side == 0 || self.crop_side == 0 {
            return Err(anyhow!("model input sides must be greater than zero"));
        }
        if self.candidate_label.trim().is_empty() {
            return Err(anyhow!("candidate_label must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<BeaconConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_models() {
        let cfg = BeaconConfig::from_file(BeaconConfigFile::default());
        assert_eq!(cfg.pipeline, PipelineConfig::default());
        assert_eq!(cfg.pipeline.input_side, 640);
        assert_eq!(cfg.pipeline.crop_side, 100);
        assert_eq!(cfg.interval, Duration::ZERO);
        assert_eq!(cfg.source, "images/");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let mut pipeline = PipelineConfig::default();
        pipeline.iou_threshold = 1.5;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.confidence_threshold = f32::NAN;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.crop_side = 0;
        assert!(pipeline.validate().is_err());
    }
}
