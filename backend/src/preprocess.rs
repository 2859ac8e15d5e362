use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageReader;
use tch::Tensor;

use crate::config::IMG_SIZE;
use crate::error::PredictError;

/// Decode raw upload bytes into the `[1, 224, 224, 3]` float tensor the
/// classifier expects: RGB, resized, channel values scaled to [0, 1].
pub fn image_to_tensor(bytes: &[u8]) -> Result<Tensor, PredictError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;

    let rgb = img
        .resize_exact(IMG_SIZE, IMG_SIZE, FilterType::Triangle)
        .to_rgb8();

    let pixels: Vec<f32> = rgb
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect();

    let side = IMG_SIZE as i64;
    Ok(Tensor::from_slice(&pixels).view([1, side, side, 3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

    fn encode(img: DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn produces_the_expected_shape_and_range() {
        let img = RgbImage::from_pixel(64, 48, Rgb([10, 128, 255]));
        let bytes = encode(DynamicImage::ImageRgb8(img), image::ImageFormat::Png);

        let tensor = image_to_tensor(&bytes).unwrap();
        assert_eq!(tensor.size(), vec![1, 224, 224, 3]);

        let flat: Vec<f32> = (&tensor.view([-1])).try_into().unwrap();
        assert!(flat.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn flattens_alpha_channels_to_rgb() {
        let img = RgbaImage::from_pixel(32, 32, image::Rgba([0, 200, 0, 120]));
        let bytes = encode(DynamicImage::ImageRgba8(img), image::ImageFormat::Png);

        let tensor = image_to_tensor(&bytes).unwrap();
        assert_eq!(tensor.size(), vec![1, 224, 224, 3]);
    }

    #[test]
    fn rejects_bytes_that_are_not_an_image() {
        let result = image_to_tensor(b"definitely not pixels");
        assert!(matches!(result, Err(PredictError::Decode(_))));
    }
}
