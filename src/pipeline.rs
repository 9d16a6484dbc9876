//! Localization → classification orchestration for one frame.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbImage;

use crate::config::{ModelPaths, PipelineConfig};
use crate::detect::{
    load_engine, ClassNames, ClassTable, ClassificationStage, Detection, LocalizationStage,
};

/// Outcome of one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    /// Localizer detections in NMS acceptance order.
    pub detections: Vec<Detection>,
    /// Final labels, index-aligned with `detections`.
    pub labels: Vec<String>,
    pub localize_time: Duration,
    pub classify_time: Duration,
}

pub struct DetectionPipeline {
    localizer: LocalizationStage,
    classifier: ClassificationStage,
}

impl DetectionPipeline {
    pub fn new(localizer: LocalizationStage, classifier: ClassificationStage) -> Self {
        Self {
            localizer,
            classifier,
        }
    }

    /// Load both models and their label tables. Any failure here is fatal.
    pub fn load(models: &ModelPaths, config: &PipelineConfig) -> Result<Self> {
        let class_names = ClassNames::load(&models.localizer_classes)?;
        let class_table = ClassTable::load(&models.classifier_labels)?;
        let localizer_engine = load_engine(&models.localizer, config.input_side)
            .context("failed to load localizer")?;
        let classifier_engine = load_engine(&models.classifier, config.crop_side)
            .context("failed to load classifier")?;
        log::info!(
            "pipeline ready: {} localizer classes, {} classifier classes",
            class_names.len(),
            class_table.len()
        );
        Ok(Self::new(
            LocalizationStage::new(localizer_engine, class_names, config),
            ClassificationStage::new(classifier_engine, class_table, config),
        ))
    }

    /// Final labels for `image`, in NMS acceptance order.
    pub fn run(&mut self, image: &RgbImage) -> Result<Vec<String>> {
        Ok(self.run_detailed(image)?.labels)
    }

    pub fn run_detailed(&mut self, image: &RgbImage) -> Result<PipelineRun> {
        let started = Instant::now();
        let detections = self.localizer.localize(image).context("localization failed")?;
        let localize_time = started.elapsed();

        let started = Instant::now();
        let labels = if detections.is_empty() {
            Vec::new()
        } else {
            self.classifier
                .classify(image, &detections)
                .context("classification failed")?
        };
        let classify_time = started.elapsed();

        Ok(PipelineRun {
            detections,
            labels,
            localize_time,
            classify_time,
        })
    }
}

/// Human-readable result string: labels joined with `", "`.
pub fn format_labels(labels: &[String]) -> String {
    labels.join(", ")
}
