#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{InferenceEngine, Tensor};

/// Memory layout the ONNX graph expects for its image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputLayout {
    Nhwc,
    Nchw,
}

/// Tract-based engine for ONNX inference.
///
/// Loads a local model file once and runs it synchronously on every call. It
/// does not perform any network I/O or write to disk beyond model loading.
pub struct TractEngine {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    side: usize,
    layout: InputLayout,
}

impl TractEngine {
    /// Load an ONNX model with a square `side`×`side` RGB input.
    pub fn new<P: AsRef<Path>>(model_path: P, side: u32, layout: InputLayout) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = side as usize;
        let input_shape = match layout {
            InputLayout::Nhwc => tvec!(1, side, side, 3),
            InputLayout::Nchw => tvec!(1, 3, side, side),
        };
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            side,
            layout,
        })
    }

    fn build_input(&self, input: &Tensor) -> Result<tract_onnx::prelude::Tensor> {
        let expected = [1, self.side, self.side, 3];
        if input.shape() != expected.as_slice() {
            return Err(anyhow!(
                "input shape {:?} does not match model input {:?}",
                input.shape(),
                expected
            ));
        }
        let side = self.side;
        let data = input.data();
        let array = match self.layout {
            InputLayout::Nhwc => tract_ndarray::Array4::from_shape_fn(
                (1, side, side, 3),
                |(_, y, x, channel)| data[(y * side + x) * 3 + channel],
            ),
            InputLayout::Nchw => tract_ndarray::Array4::from_shape_fn(
                (1, 3, side, side),
                |(_, channel, y, x)| data[(y * side + x) * 3 + channel],
            ),
        };
        Ok(array.into_tensor())
    }
}

impl InferenceEngine for TractEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, input: Tensor) -> Result<Tensor> {
        let input = self.build_input(&input)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        Tensor::new(view.shape().to_vec(), view.iter().copied().collect())
    }

    fn warm_up(&mut self) -> Result<()> {
        let zeros = Tensor::new(vec![1, self.side, self.side, 3], vec![0.0; self.side * self.side * 3])?;
        self.infer(zeros).map(|_| ())
    }
}
