use anyhow::{anyhow, Result};
use image::RgbImage;

use super::backend::{argmax, InferenceEngine};
use super::labels::ClassTable;
use super::preprocess::{crop_region, image_to_tensor};
use super::result::{Detection, Label};
use crate::config::PipelineConfig;

/// Secondary classifier for candidate regions.
///
/// Only `Label::Candidate` detections reach the classifier; every other label
/// passes through untouched.
pub struct ClassificationStage {
    engine: Box<dyn InferenceEngine>,
    table: ClassTable,
    input_side: u32,
}

impl ClassificationStage {
    pub fn new(engine: Box<dyn InferenceEngine>, table: ClassTable, config: &PipelineConfig) -> Self {
        Self {
            engine,
            table,
            input_side: config.crop_side,
        }
    }

    /// Resolve the final label of every detection, preserving order.
    pub fn classify(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<Vec<String>> {
        detections
            .iter()
            .map(|detection| match &detection.label {
                Label::Candidate => match crop_region(image, &detection.bbox) {
                    Some(crop) => self.predict(&crop),
                    None => {
                        log::debug!(
                            "empty crop for candidate at {:?}; marking unclassifiable",
                            detection.bbox
                        );
                        Ok(Label::Unclassifiable.to_string())
                    }
                },
                other => Ok(other.to_string()),
            })
            .collect()
    }

    fn predict(&mut self, crop: &RgbImage) -> Result<String> {
        let input = image_to_tensor(crop, self.input_side)?;
        let output = self.engine.infer(input)?;
        let class_id =
            argmax(output.data()).ok_or_else(|| anyhow!("classifier produced an empty output"))?;
        self.table
            .name(class_id)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("classifier id {} missing from class table", class_id))
    }
}
