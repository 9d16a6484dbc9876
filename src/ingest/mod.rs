//! Frame sources.
//!
//! This module provides the sources that supply one RGB image per tick:
//! - Image directories (a random file is picked per frame)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//! - Stub source (testing)
//!
//! A source failure affects only the tick that requested the frame. Sources
//! hand the frame to the caller and keep no reference to it.

pub mod directory;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;
use image::RgbImage;

pub use directory::DirectorySource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Supplies one image per pipeline invocation.
pub trait FrameSource: Send {
    /// Human-readable source description for logs.
    fn describe(&self) -> String;

    /// Capture or load the next frame.
    fn next_frame(&mut self) -> Result<RgbImage>;
}

/// Open a frame source from a URI.
///
/// - `stub://<name>`: synthetic frames
/// - `/dev/video*` or `v4l2://<device>`: camera capture
/// - anything else: a local directory of images
pub fn open_source(uri: &str) -> Result<Box<dyn FrameSource>> {
    if uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(uri, 640, 480)));
    }
    if let Some(device) = camera_device(uri) {
        #[cfg(feature = "ingest-v4l2")]
        {
            let mut source = V4l2Source::new(V4l2Config {
                device: device.to_string(),
                ..V4l2Config::default()
            })?;
            source.connect()?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            anyhow::bail!("camera source {} requires the ingest-v4l2 feature", device)
        }
    }
    Ok(Box::new(DirectorySource::new(uri)?))
}

fn camera_device(uri: &str) -> Option<&str> {
    if let Some(device) = uri.strip_prefix("v4l2://") {
        return Some(device);
    }
    uri.starts_with("/dev/video").then_some(uri)
}
