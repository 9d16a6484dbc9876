//! Image-directory frame source.
//!
//! Stand-in for a live camera: each frame is a randomly chosen image file from
//! a local directory. The listing is re-read per frame so images can be added
//! or removed while the daemon runs.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use rand::seq::SliceRandom;

use super::FrameSource;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct DirectorySource {
    dir: PathBuf,
    frames_loaded: u64,
    last_picked: Option<PathBuf>,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(anyhow!("image directory {} does not exist", dir.display()));
        }
        log::info!("DirectorySource: reading frames from {}", dir.display());
        Ok(Self {
            dir,
            frames_loaded: 0,
            last_picked: None,
        })
    }

    /// File used for the most recent frame.
    pub fn last_picked(&self) -> Option<&Path> {
        self.last_picked.as_deref()
    }

    pub fn frames_loaded(&self) -> u64 {
        self.frames_loaded
    }

    fn list_images(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;
        let mut images = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                images.push(path);
            }
        }
        Ok(images)
    }
}

impl FrameSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }

    fn next_frame(&mut self) -> Result<RgbImage> {
        let images = self.list_images()?;
        let picked = images
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| anyhow!("no images available in {}", self.dir.display()))?;
        log::debug!("DirectorySource: picked {}", picked.display());

        let frame = image::open(picked)
            .with_context(|| format!("failed to decode {}", picked.display()))?
            .into_rgb8();
        self.frames_loaded += 1;
        self.last_picked = Some(picked.clone());
        Ok(frame)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn loads_a_random_image_from_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(12, 8, Rgb([10, 20, 30])).save(dir.path().join("a.png"))?;
        RgbImage::from_pixel(12, 8, Rgb([10, 20, 30])).save(dir.path().join("b.PNG"))?;
        std::fs::write(dir.path().join("notes.txt"), "not an image")?;

        let mut source = DirectorySource::new(dir.path())?;
        for _ in 0..4 {
            let frame = source.next_frame()?;
            assert_eq!(frame.dimensions(), (12, 8));
            assert_eq!(frame.get_pixel(0, 0), &Rgb([10, 20, 30]));
            let picked = source.last_picked().expect("picked file");
            assert!(has_image_extension(picked));
        }
        assert_eq!(source.frames_loaded(), 4);
        Ok(())
    }

    #[test]
    fn empty_directory_is_a_per_frame_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = DirectorySource::new(dir.path())?;
        let err = source.next_frame().unwrap_err();
        assert!(err.to_string().contains("no images available"));

        // The source recovers once images appear.
        RgbImage::new(4, 4).save(dir.path().join("late.png"))?;
        assert_eq!(source.next_frame()?.dimensions(), (4, 4));
        Ok(())
    }

    #[test]
    fn undecodable_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("broken.jpg"), b"not really a jpeg")?;
        let mut source = DirectorySource::new(dir.path())?;
        assert!(source.next_frame().is_err());
        Ok(())
    }
}
