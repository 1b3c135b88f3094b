use image::{imageops, imageops::FilterType, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use thiserror::Error;

/// Per-pixel difference above this value counts as change
pub const BINARY_THRESHOLD: u8 = 45;
/// Number of 3x3 dilation passes used to merge neighbouring change regions
pub const DILATE_ITERATIONS: u8 = 2;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Frame shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },
}

/// Outcome of comparing two preprocessed frames
#[derive(Debug, Clone)]
pub struct ChangeScore {
    /// Sum of the areas of all contours that passed the minimum area filter
    pub score: f64,
    pub contours: Vec<Contour<i32>>,
    /// Binarized and dilated difference image
    pub diff: GrayImage,
}

pub struct ChangeScorer {
    min_contour_area: f64,
}

impl ChangeScorer {
    pub fn new(min_contour_area: f64) -> Self {
        Self { min_contour_area }
    }

    pub fn score(&self, prev: &GrayImage, next: &GrayImage) -> Result<ChangeScore, ScoreError> {
        if prev.dimensions() != next.dimensions() {
            return Err(ScoreError::ShapeMismatch {
                left: prev.dimensions(),
                right: next.dimensions(),
            });
        }

        let delta = abs_diff(prev, next);
        let binary = binarize(&delta, BINARY_THRESHOLD);
        // Two 3x3 passes cover the same neighbourhood as one chessboard radius of 2
        let diff = dilate(&binary, Norm::LInf, DILATE_ITERATIONS);

        let mut score = 0.0;
        let mut contours = Vec::new();
        for contour in external_contours(&diff) {
            let area = contour_area(&contour);
            if area < self.min_contour_area {
                continue;
            }
            score += area;
            contours.push(contour);
        }

        Ok(ChangeScore {
            score,
            contours,
            diff,
        })
    }
}

/// Brings two frames to a common shape: each axis shrinks to the smaller of
/// the two sizes. No axis is ever upscaled.
pub fn equalize(prev: GrayImage, next: GrayImage) -> (GrayImage, GrayImage) {
    if prev.dimensions() == next.dimensions() {
        return (prev, next);
    }

    let target = (prev.width().min(next.width()), prev.height().min(next.height()));
    let shrink = |img: GrayImage, role: &str| {
        if img.dimensions() == target {
            return img;
        }
        log::debug!("Resizing {} {:?} -> {:?}", role, img.dimensions(), target);
        imageops::resize(&img, target.0, target.1, FilterType::Triangle)
    };

    (shrink(prev, "predecessor"), shrink(next, "successor"))
}

fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0].abs_diff(b.get_pixel(x, y).0[0])])
    })
}

fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Outer borders that are not nested inside another region, in `binary`'s
/// coordinates
fn external_contours(binary: &GrayImage) -> impl Iterator<Item = Contour<i32>> {
    // The tracer only starts an outer border after a background pixel, so
    // regions touching column 0 need a blank frame around them
    let mut padded = GrayImage::new(binary.width() + 2, binary.height() + 2);
    imageops::replace(&mut padded, binary, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|mut contour| {
            for point in &mut contour.points {
                point.x -= 1;
                point.y -= 1;
            }
            contour
        })
}

/// Polygon area of the traced border (shoelace formula)
pub fn contour_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([0]))
    }

    fn with_square(mut img: GrayImage, x0: u32, y0: u32, side: u32, value: u8) -> GrayImage {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.put_pixel(x, y, Luma([value]));
            }
        }
        img
    }

    #[test]
    fn test_identical_frames_score_zero() {
        let frame = with_square(black(100, 100), 10, 10, 30, 200);
        let scorer = ChangeScorer::new(500.0);

        let result = scorer.score(&frame, &frame.clone()).unwrap();

        assert_eq!(result.score, 0.0);
        assert!(result.contours.is_empty());
        assert!(result.diff.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_square_change_is_dilated_and_measured() {
        let prev = black(100, 100);
        let next = with_square(black(100, 100), 20, 20, 40, 255);
        let scorer = ChangeScorer::new(500.0);

        let result = scorer.score(&prev, &next).unwrap();

        // 40px square grows to 44px, traced through pixel centres
        assert_eq!(result.contours.len(), 1);
        assert_eq!(result.score, 43.0 * 43.0);
        assert_eq!(result.diff.get_pixel(18, 18).0[0], 255);
        assert_eq!(result.diff.get_pixel(17, 17).0[0], 0);
    }

    #[test]
    fn test_small_changes_are_filtered() {
        let prev = black(100, 100);
        let next = with_square(black(100, 100), 50, 50, 2, 255);

        let result = ChangeScorer::new(500.0).score(&prev, &next).unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.contours.is_empty());

        let result = ChangeScorer::new(0.0).score(&prev, &next).unwrap();
        assert!(result.score > 0.0);
    }

    #[test]
    fn test_differences_below_threshold_are_ignored() {
        let prev = GrayImage::from_pixel(50, 50, Luma([100]));
        let next = GrayImage::from_pixel(50, 50, Luma([100 + BINARY_THRESHOLD]));

        let result = ChangeScorer::new(0.0).score(&prev, &next).unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let result = ChangeScorer::new(0.0).score(&black(10, 10), &black(10, 12));
        assert!(matches!(result, Err(ScoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_equalize_shrinks_larger_frame() {
        let (a, b) = equalize(black(200, 100), black(100, 50));
        assert_eq!(a.dimensions(), (100, 50));
        assert_eq!(b.dimensions(), (100, 50));

        let (a, b) = equalize(black(64, 48), black(128, 96));
        assert_eq!(a.dimensions(), (64, 48));
        assert_eq!(b.dimensions(), (64, 48));
    }

    #[test]
    fn test_equalize_never_stretches_an_axis() {
        // wider but shorter predecessor, narrower but taller successor
        let (a, b) = equalize(black(200, 50), black(100, 90));
        assert_eq!(a.dimensions(), (100, 50));
        assert_eq!(b.dimensions(), (100, 50));

        let (a, b) = equalize(black(60, 80), black(80, 60));
        assert_eq!(a.dimensions(), (60, 60));
        assert_eq!(b.dimensions(), (60, 60));
    }

    #[test]
    fn test_changes_touching_each_edge_are_measured() {
        let prev = black(100, 100);
        let scorer = ChangeScorer::new(500.0);

        // dilation is clipped on the touching side: 42x44 region, traced 41x43
        for (name, x0, y0) in [("left", 0, 30), ("top", 30, 0), ("right", 60, 30), ("bottom", 30, 60)] {
            let next = with_square(black(100, 100), x0, y0, 40, 255);
            let result = scorer.score(&prev, &next).unwrap();
            assert_eq!(result.contours.len(), 1, "{name} edge");
            assert_eq!(result.score, 41.0 * 43.0, "{name} edge");
        }

        // clipped on two sides: 42x42 region
        let corner = with_square(black(100, 100), 0, 0, 40, 255);
        let result = scorer.score(&prev, &corner).unwrap();
        assert_eq!(result.score, 41.0 * 41.0);
    }

    #[test]
    fn test_contours_stay_in_frame_coordinates() {
        let prev = black(100, 100);
        let next = with_square(black(100, 100), 0, 0, 40, 255);

        let result = ChangeScorer::new(0.0).score(&prev, &next).unwrap();

        let contour = &result.contours[0];
        assert!(contour.points.iter().any(|p| p.x == 0 && p.y == 0));
        assert!(contour.points.iter().all(|p| p.x >= 0 && p.y >= 0 && p.x < 100 && p.y < 100));
    }

    #[test]
    fn test_whole_frame_change_is_measured() {
        let prev = black(100, 100);
        let next = GrayImage::from_pixel(100, 100, Luma([255]));

        let result = ChangeScorer::new(500.0).score(&prev, &next).unwrap();

        assert_eq!(result.contours.len(), 1);
        assert_eq!(result.score, 99.0 * 99.0);
    }

    #[test]
    fn test_more_change_scores_higher() {
        let prev = black(120, 120);
        let small = with_square(black(120, 120), 10, 10, 30, 255);
        let large = with_square(black(120, 120), 10, 10, 80, 255);
        let scorer = ChangeScorer::new(100.0);

        let small_score = scorer.score(&prev, &small).unwrap().score;
        let large_score = scorer.score(&prev, &large).unwrap().score;
        assert!(large_score > small_score);
    }
}
