//! Localization stage: detector output tensor → scored, deduplicated boxes.

use anyhow::{anyhow, Result};
use image::RgbImage;

use super::backend::{argmax, InferenceEngine, Tensor};
use super::bbox::{non_max_suppression, BoundingBox};
use super::labels::ClassNames;
use super::preprocess::image_to_tensor;
use super::result::{Detection, Label};
use crate::config::PipelineConfig;

/// Values preceding the per-class scores in each detector row.
const ROW_PREFIX: usize = 5;

/// Box surviving NMS, before the class index is mapped to a label.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredBox {
    pub bbox: BoundingBox,
    pub score: f32,
    pub class_id: usize,
}

/// Decode a detector output of rows `(cx, cy, w, h, conf, class scores…)`.
///
/// Coordinates are normalized to `[0, 1]` and are denormalized against the
/// source image `width`×`height`. Rows with confidence at or below
/// `confidence_threshold` are dropped before NMS. The result is in NMS
/// acceptance order.
pub fn decode_predictions(
    output: &Tensor,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<ScoredBox>> {
    let (sx, sy) = (width as f32, height as f32);
    let mut candidates = Vec::new();
    for row in output.rows()? {
        if row.len() <= ROW_PREFIX {
            return Err(anyhow!(
                "detector row has {} values, expected more than {}",
                row.len(),
                ROW_PREFIX
            ));
        }
        let score = row[4];
        // Keep strictly-above-threshold rows only; NaN never qualifies.
        if !(score > confidence_threshold) {
            continue;
        }
        let class_id = argmax(&row[ROW_PREFIX..]).unwrap_or(0);
        let bbox = BoundingBox::from_center(row[0], row[1], row[2], row[3]).scaled(sx, sy);
        candidates.push(ScoredBox {
            bbox,
            score,
            class_id,
        });
    }

    let boxes: Vec<BoundingBox> = candidates.iter().map(|c| c.bbox).collect();
    let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    let keep = non_max_suppression(&boxes, &scores, iou_threshold);
    Ok(keep.into_iter().map(|idx| candidates[idx].clone()).collect())
}

pub struct LocalizationStage {
    engine: Box<dyn InferenceEngine>,
    class_names: ClassNames,
    input_side: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    candidate_label: String,
}

impl LocalizationStage {
    pub fn new(
        engine: Box<dyn InferenceEngine>,
        class_names: ClassNames,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            engine,
            class_names,
            input_side: config.input_side,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            candidate_label: config.candidate_label.clone(),
        }
    }

    /// Run the detector on `image` and return surviving detections in NMS order.
    pub fn localize(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let input = image_to_tensor(image, self.input_side)?;
        let output = self.engine.infer(input)?;
        let scored = decode_predictions(
            &output,
            width,
            height,
            self.confidence_threshold,
            self.iou_threshold,
        )?;

        scored
            .into_iter()
            .map(|scored| {
                let name = self.class_names.get(scored.class_id).ok_or_else(|| {
                    anyhow!(
                        "class index {} outside label table of {} entries",
                        scored.class_id,
                        self.class_names.len()
                    )
                })?;
                let label = if name == self.candidate_label {
                    Label::Candidate
                } else {
                    Label::Named(name.to_string())
                };
                Ok(Detection {
                    bbox: scored.bbox,
                    score: scored.score,
                    label,
                })
            })
            .collect()
    }
}
