mod backend;
pub mod backends;
mod bbox;
mod classify;
mod labels;
mod localize;
mod preprocess;
mod result;

pub use backend::{InferenceEngine, Tensor};
pub use backends::{load_engine, ScriptedEngine};
pub use bbox::{non_max_suppression, BoundingBox};
pub use classify::ClassificationStage;
pub use labels::{ClassNames, ClassTable};
pub use localize::{decode_predictions, LocalizationStage, ScoredBox};
pub use preprocess::{crop_region, image_to_tensor};
pub use result::{Detection, Label, UNCLASSIFIABLE_LABEL};
