use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::backend::{InferenceEngine, Tensor};

/// Engine that replays canned outputs instead of running a model.
///
/// Outputs are returned in order and cycle once exhausted. Lets the pipeline
/// and scheduler run without model files.
pub struct ScriptedEngine {
    outputs: Vec<Tensor>,
    next: usize,
    delay: Option<Duration>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
    last_input_shape: Arc<Mutex<Option<Vec<usize>>>>,
}

impl ScriptedEngine {
    pub fn new(output: Tensor) -> Self {
        Self::sequence(vec![output])
    }

    pub fn sequence(outputs: Vec<Tensor>) -> Self {
        Self {
            outputs,
            next: 0,
            delay: None,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_input_shape: Arc::new(Mutex::new(None)),
        }
    }

    /// Engine whose every invocation fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut engine = Self::sequence(Vec::new());
        engine.failure = Some(message.into());
        engine
    }

    /// Sleep for `delay` inside every invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared invocation counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Shape of the most recent input, shared with the caller.
    pub fn last_input_shape(&self) -> Arc<Mutex<Option<Vec<usize>>>> {
        self.last_input_shape.clone()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn infer(&mut self, input: Tensor) -> Result<Tensor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_input_shape
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(input.shape().to_vec());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }
        if self.outputs.is_empty() {
            return Err(anyhow!("scripted engine has no outputs"));
        }
        let output = self.outputs[self.next % self.outputs.len()].clone();
        self.next = self.next.wrapping_add(1);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_engine_cycles_outputs_and_counts_calls() -> Result<()> {
        let a = Tensor::new(vec![1, 2], vec![1.0, 0.0])?;
        let b = Tensor::new(vec![1, 2], vec![0.0, 1.0])?;
        let mut engine = ScriptedEngine::sequence(vec![a.clone(), b.clone()]);
        let calls = engine.calls();
        let input = Tensor::new(vec![1, 1], vec![0.5])?;

        assert_eq!(engine.infer(input.clone())?, a);
        assert_eq!(engine.infer(input.clone())?, b);
        assert_eq!(engine.infer(input)?, a);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*engine.last_input_shape().lock().unwrap(), Some(vec![1, 1]));
        Ok(())
    }

    #[test]
    fn failing_engine_reports_error() -> Result<()> {
        let mut engine = ScriptedEngine::failing("engine offline");
        let err = engine
            .infer(Tensor::new(vec![1], vec![0.0])?)
            .unwrap_err();
        assert!(err.to_string().contains("engine offline"));
        Ok(())
    }
}
