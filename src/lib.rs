//! Label beacon
//!
//! Edge-device sign labeller. While a consumer is subscribed, a background
//! loop repeatedly grabs a frame, localizes candidate regions with a detector,
//! classifies each candidate crop, and notifies the consumer with the
//! resulting label string.
//!
//! # Module Structure
//!
//! - `detect`: tensor contract, box decoding, NMS, localization and
//!   classification stages, inference backends
//! - `pipeline`: the two-stage `DetectionPipeline`
//! - `ingest`: frame sources (image directory, V4L2 camera, stub)
//! - `schedule`: the pausable `PeriodicScheduler`
//! - `job`: per-tick glue between source, pipeline and scheduler
//! - `transport`: notification boundary and characteristic handlers
//! - `netaddr`: best-effort local address lookup
//! - `results`: optional JSON-lines result record
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod ingest;
pub mod job;
pub mod netaddr;
pub mod pipeline;
pub mod results;
pub mod schedule;
pub mod transport;

pub use config::{BeaconConfig, ModelPaths, PipelineConfig};
pub use detect::{
    BoundingBox, Detection, InferenceEngine, Label, ScriptedEngine, Tensor, UNCLASSIFIABLE_LABEL,
};
pub use ingest::{open_source, DirectorySource, FrameSource, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::{V4l2Config, V4l2Source};
pub use job::LabelJob;
pub use netaddr::{local_address, UNKNOWN_ADDRESS};
pub use pipeline::{format_labels, DetectionPipeline, PipelineRun};
pub use results::{ResultLog, ResultRecord};
pub use schedule::{PeriodicScheduler, ResultCallback, SchedulerPhase, SchedulerStats};
pub use transport::{AddressCharacteristic, ConsoleNotifier, LabelCharacteristic, Notifier};
