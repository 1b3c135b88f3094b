use crate::core::mask::Mask;
use image::{imageops, DynamicImage, GrayImage, Luma};

/// Gaussian sigma for a square kernel of size `ksize`, matching the usual
/// "sigma from aperture" rule used when only a kernel size is given.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Turns decoded frames into masked, smoothed grayscale images ready for scoring
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    blur_kernels: Vec<u32>,
}

impl Preprocessor {
    pub fn new(blur_kernels: Vec<u32>) -> Self {
        Self { blur_kernels }
    }

    /// Grayscale, then every blur pass in order, then the border mask
    pub fn preprocess(&self, img: &DynamicImage, mask: Mask) -> GrayImage {
        let mut gray = img.to_luma8();

        // Passes compound; a zero kernel means no blur
        for &ksize in self.blur_kernels.iter().filter(|&&k| k > 0) {
            gray = imageops::blur(&gray, sigma_for_kernel(ksize));
        }

        apply_mask(&mut gray, mask);
        gray
    }
}

/// Blackens every pixel outside the mask window
pub fn apply_mask(img: &mut GrayImage, mask: Mask) {
    if mask.is_none() {
        return;
    }

    let (x_min, y_min, x_max, y_max) = mask.window(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if x < x_min || x >= x_max || y < y_min || y >= y_max {
            *pixel = Luma([0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let intensity = ((x * 7 + y * 3) % 200 + 30) as u8;
            Rgb([intensity, intensity, intensity])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_sigma_for_kernel() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-5);
        assert!((sigma_for_kernel(11) - 2.0).abs() < 1e-5);
        assert!((sigma_for_kernel(21) - 3.5).abs() < 1e-5);
    }

    #[test]
    fn test_null_mask_leaves_image_unchanged() {
        let img = gradient_image(40, 30);
        let preprocessor = Preprocessor::new(Vec::new());

        let processed = preprocessor.preprocess(&img, Mask::NONE);

        assert_eq!(processed, img.to_luma8());
    }

    #[test]
    fn test_top_mask_zeroes_exact_rows() {
        let img = gradient_image(40, 50);
        let preprocessor = Preprocessor::new(Vec::new());

        let processed = preprocessor.preprocess(&img, Mask::new(0.0, 30.0, 0.0, 0.0));
        let original = img.to_luma8();

        // 30% of 50 rows
        for (x, y, pixel) in processed.enumerate_pixels() {
            if y < 15 {
                assert_eq!(pixel.0[0], 0, "pixel ({x}, {y}) should be masked");
            } else {
                assert_eq!(pixel, original.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_side_masks() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 10, Rgb([200, 200, 200])));
        let preprocessor = Preprocessor::default();

        let processed = preprocessor.preprocess(&img, Mask::new(10.0, 0.0, 25.0, 20.0));

        // left 2 columns, right 5 columns, bottom 2 rows
        assert_eq!(processed.get_pixel(1, 0).0[0], 0);
        assert_ne!(processed.get_pixel(2, 0).0[0], 0);
        assert_ne!(processed.get_pixel(14, 7).0[0], 0);
        assert_eq!(processed.get_pixel(15, 0).0[0], 0);
        assert_eq!(processed.get_pixel(5, 8).0[0], 0);
    }

    #[test]
    fn test_blur_keeps_dimensions_and_smooths() {
        let mut img = ImageBuffer::from_pixel(32, 32, Rgb([0u8, 0, 0]));
        img.put_pixel(16, 16, Rgb([255, 255, 255]));
        let img = DynamicImage::ImageRgb8(img);

        let processed = Preprocessor::new(vec![5, 11]).preprocess(&img, Mask::NONE);

        assert_eq!(processed.dimensions(), (32, 32));
        assert!(processed.get_pixel(16, 16).0[0] < 255);
        assert!(processed.get_pixel(17, 16).0[0] > 0);
    }

    #[test]
    fn test_zero_kernel_skips_blur() {
        let img = gradient_image(24, 24);
        let processed = Preprocessor::new(vec![0, 0]).preprocess(&img, Mask::NONE);
        assert_eq!(processed, img.to_luma8());
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let img = gradient_image(64, 48);
        let preprocessor = Preprocessor::new(vec![5, 11, 21]);
        let mask = Mask::new(0.0, 29.0, 0.0, 0.0);

        assert_eq!(
            preprocessor.preprocess(&img, mask),
            preprocessor.preprocess(&img, mask)
        );
    }
}
