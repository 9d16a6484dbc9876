pub mod scripted;

#[cfg(feature = "backend-tract")]
pub mod tract;

use std::path::Path;

use anyhow::Result;

pub use scripted::ScriptedEngine;

#[cfg(feature = "backend-tract")]
pub use tract::{InputLayout, TractEngine};

use super::backend::InferenceEngine;

/// Load the compiled-in inference engine for a square-input model file.
pub fn load_engine(model_path: &Path, side: u32) -> Result<Box<dyn InferenceEngine>> {
    #[cfg(feature = "backend-tract")]
    {
        let mut engine = TractEngine::new(model_path, side, InputLayout::Nhwc)?;
        engine.warm_up()?;
        log::info!(
            "loaded {} engine from {} ({}x{} input)",
            engine.name(),
            model_path.display(),
            side,
            side
        );
        Ok(Box::new(engine))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        anyhow::bail!(
            "cannot load {} ({}x{} input): model inference requires the backend-tract feature",
            model_path.display(),
            side,
            side
        )
    }
}
