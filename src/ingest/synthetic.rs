use anyhow::Result;
use image::RgbImage;

use super::FrameSource;

/// Synthetic source for `stub://` URIs.
///
/// Produces a shifting gradient so consecutive frames differ.
pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            frame_count: 0,
            scene_state: 0,
        }
    }

    pub fn frames_generated(&self) -> u64 {
        self.frame_count
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("{} (synthetic {}x{})", self.name, self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<RgbImage> {
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let offset = self.frame_count + u64::from(self.scene_state);
        Ok(RgbImage::from_fn(self.width, self.height, |x, y| {
            let base = u64::from(x) + u64::from(y) * u64::from(self.width) + offset;
            image::Rgb([
                (base % 256) as u8,
                ((base / 2) % 256) as u8,
                ((base / 3) % 256) as u8,
            ])
        }))
    }
}
