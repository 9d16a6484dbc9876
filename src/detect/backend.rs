use anyhow::{anyhow, Result};

/// Dense f32 tensor exchanged with inference engines.
///
/// Image inputs are laid out NHWC (`[1, side, side, 3]`), matching the
/// layout the localizer and classifier models were exported with.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
            .ok_or_else(|| anyhow!("tensor shape {:?} overflows", shape))?;
        if expected != data.len() {
            return Err(anyhow!(
                "tensor shape {:?} expects {} values, received {}",
                shape,
                expected,
                data.len()
            ));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Iterate over the innermost dimension as rows.
    ///
    /// A detector output of shape `[1, N, 5 + C]` yields `N` rows of `5 + C` values.
    pub fn rows(&self) -> Result<std::slice::ChunksExact<'_, f32>> {
        let width = match self.shape.last() {
            Some(&width) if width > 0 => width,
            _ => return Err(anyhow!("tensor shape {:?} has no row dimension", self.shape)),
        };
        Ok(self.data.chunks_exact(width))
    }
}

/// Opaque synchronous inference capability: tensor in, tensor out.
///
/// Engines are loaded once at startup and reused for every tick. They must
/// not retain the input tensor beyond the `infer` call.
pub trait InferenceEngine: Send {
    /// Engine identifier.
    fn name(&self) -> &'static str;

    /// Run one forward pass.
    fn infer(&mut self, input: Tensor) -> Result<Tensor>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Index of the first maximum value, or `None` for an empty slice.
pub(crate) fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}
