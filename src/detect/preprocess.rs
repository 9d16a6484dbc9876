use anyhow::Result;
use image::imageops::{self, FilterType};
use image::RgbImage;

use super::backend::Tensor;
use super::bbox::BoundingBox;

/// Resize to `side`×`side` and scale pixels to `[0, 1]` as an NHWC tensor.
pub fn image_to_tensor(image: &RgbImage, side: u32) -> Result<Tensor> {
    let resized = imageops::resize(image, side, side, FilterType::Triangle);
    let data = resized
        .as_raw()
        .iter()
        .map(|&p| f32::from(p) / 255.0)
        .collect();
    Tensor::new(vec![1, side as usize, side as usize, 3], data)
}

/// Crop `bbox` out of `image`, truncating to whole pixels and clamping to the
/// image bounds. Returns `None` when nothing is left to crop.
pub fn crop_region(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (width, height) = image.dimensions();
    let xmin = clamp_coord(bbox.xmin, width);
    let ymin = clamp_coord(bbox.ymin, height);
    let xmax = clamp_coord(bbox.xmax, width);
    let ymax = clamp_coord(bbox.ymax, height);
    if xmax <= xmin || ymax <= ymin {
        return None;
    }
    Some(imageops::crop_imm(image, xmin, ymin, xmax - xmin, ymax - ymin).to_image())
}

fn clamp_coord(value: f32, limit: u32) -> u32 {
    // Saturating cast: negatives and NaN become 0.
    (value as u32).min(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn tensor_has_nhwc_shape_and_unit_range() -> Result<()> {
        let image = RgbImage::from_pixel(37, 21, Rgb([255, 0, 51]));
        let tensor = image_to_tensor(&image, 8)?;
        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
        let first = &tensor.data()[..3];
        assert!((first[0] - 1.0).abs() < 0.01);
        assert!(first[1] < 0.01);
        assert!((first[2] - 0.2).abs() < 0.01);
        assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(())
    }

    #[test]
    fn crop_truncates_coordinates() {
        let image = RgbImage::new(100, 80);
        let crop = crop_region(&image, &BoundingBox::new(10.7, 5.2, 40.9, 25.5)).expect("crop");
        assert_eq!(crop.dimensions(), (30, 20));
    }

    #[test]
    fn crop_clamps_to_image_bounds() {
        let image = RgbImage::new(100, 80);
        let crop = crop_region(&image, &BoundingBox::new(-20.0, -5.0, 130.0, 95.0)).expect("crop");
        assert_eq!(crop.dimensions(), (100, 80));
    }

    #[test]
    fn crop_rejects_empty_regions() {
        let image = RgbImage::new(100, 80);
        assert!(crop_region(&image, &BoundingBox::new(10.0, 10.0, 10.4, 40.0)).is_none());
        assert!(crop_region(&image, &BoundingBox::new(120.0, 10.0, 150.0, 40.0)).is_none());
        assert!(crop_region(&image, &BoundingBox::new(-30.0, 10.0, -5.0, 40.0)).is_none());
        assert!(crop_region(&image, &BoundingBox::new(f32::NAN, 0.0, f32::NAN, 10.0)).is_none());
    }
}
