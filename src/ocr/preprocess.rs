use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use crate::capture::PixelBuffer;

/// Integer upscale applied before filtering. Tesseract reads small UI
/// digits far better at twice their on-screen size.
pub const UPSCALE_FACTOR: u32 = 2;

/// Bilateral filter window diameter in pixels.
pub const BILATERAL_DIAMETER: u32 = 7;
/// Bilateral range sigma (intensity units).
pub const BILATERAL_SIGMA_COLOR: f32 = 55.0;
/// Bilateral spatial sigma (pixels).
pub const BILATERAL_SIGMA_SPACE: f32 = 55.0;

/// Converts a captured region into a strictly black/white image for OCR.
///
/// Steps, in order: grayscale, cubic upscale by [`UPSCALE_FACTOR`],
/// bilateral smoothing, Otsu threshold. Pixels above the Otsu level become
/// 255 and everything else 0. The output depends only on the input pixels.
pub fn normalize(pixels: &PixelBuffer) -> GrayImage {
    let gray = imageops::grayscale(pixels);
    let upscaled = upscale(&gray, UPSCALE_FACTOR);
    let smoothed = bilateral_filter(
        &upscaled,
        BILATERAL_DIAMETER,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPACE,
    );
    let level = otsu_level(&smoothed);
    binarize(&smoothed, level)
}

/// Scales by an integer factor with Catmull-Rom (cubic) interpolation.
pub fn upscale(img: &GrayImage, factor: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if factor <= 1 || w == 0 || h == 0 {
        return img.clone();
    }
    imageops::resize(img, w * factor, h * factor, FilterType::CatmullRom)
}

/// Edge-preserving smoothing over a circular window of `diameter` pixels.
///
/// Each output pixel is the mean of its neighbours weighted by spatial
/// distance and by intensity difference from the centre. Border pixels are
/// replicated outward.
pub fn bilateral_filter(
    img: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    let (w, h) = img.dimensions();
    let radius = (diameter / 2) as i32;
    if w == 0 || h == 0 || radius == 0 {
        return img.clone();
    }

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    // Spatial kernel restricted to the disc of `radius`
    let mut kernel: Vec<(i32, i32, f32)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist_sq = (dx * dx + dy * dy) as f32;
            if dist_sq <= (radius * radius) as f32 {
                kernel.push((dx, dy, (dist_sq * space_coeff).exp()));
            }
        }
    }

    // Range weights for every possible intensity difference
    let color_weights: Vec<f32> = (0..256)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let max_x = w as i32 - 1;
    let max_y = h as i32 - 1;
    let mut output = GrayImage::new(w, h);

    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let center = img.get_pixel(x as u32, y as u32)[0];
            let mut sum = 0.0f32;
            let mut weight_sum = 0.0f32;

            for &(dx, dy, space_weight) in &kernel {
                let nx = (x + dx).clamp(0, max_x) as u32;
                let ny = (y + dy).clamp(0, max_y) as u32;
                let value = img.get_pixel(nx, ny)[0];
                let weight = space_weight * color_weights[center.abs_diff(value) as usize];
                sum += f32::from(value) * weight;
                weight_sum += weight;
            }

            let value = if weight_sum > 0.0 {
                (sum / weight_sum).round().clamp(0.0, 255.0) as u8
            } else {
                center
            };
            output.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }

    output
}

/// Otsu's global threshold: the level that maximizes between-class variance
/// of the histogram. Returns 0 when the image has a single intensity.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p[0] as usize] += 1;
    }

    let total = img.pixels().len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut level = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_all - sum_background) / weight_foreground;
        let diff = mean_background - mean_foreground;
        let variance = weight_background * weight_foreground * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            level = t as u8;
        }
    }

    level
}

/// Maps every pixel to 255 if it is above `level`, otherwise 0.
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Light panel with a dark vertical bar, roughly a "1" glyph.
    fn price_like_capture() -> RgbImage {
        RgbImage::from_fn(30, 12, |x, _y| {
            if (12..16).contains(&x) {
                Rgb([30, 30, 40])
            } else {
                Rgb([220, 215, 200])
            }
        })
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let capture = price_like_capture();
        let first = normalize(&capture);
        let second = normalize(&capture);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_normalize_output_is_binary_and_upscaled() {
        let out = normalize(&price_like_capture());
        assert_eq!(out.dimensions(), (60, 24));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_normalize_keeps_glyph_dark() {
        let out = normalize(&price_like_capture());
        // Bar centre and background after 2x scaling
        assert_eq!(out.get_pixel(28, 12)[0], 0);
        assert_eq!(out.get_pixel(4, 12)[0], 255);
        assert_eq!(out.get_pixel(55, 12)[0], 255);
    }

    #[test]
    fn test_otsu_splits_bimodal_histogram() {
        let img = GrayImage::from_fn(10, 1, |x, _| if x < 5 { Luma([10]) } else { Luma([200]) });
        let level = otsu_level(&img);
        assert!((10..200).contains(&level));

        let bin = binarize(&img, level);
        assert_eq!(bin.get_pixel(0, 0)[0], 0);
        assert_eq!(bin.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn test_otsu_uniform_image() {
        let img = GrayImage::from_pixel(4, 4, Luma([90]));
        assert_eq!(otsu_level(&img), 0);
    }

    #[test]
    fn test_bilateral_preserves_flat_regions() {
        let img = GrayImage::from_pixel(9, 9, Luma([128]));
        let out = bilateral_filter(&img, 7, 55.0, 55.0);
        assert!(out.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn test_bilateral_keeps_strong_edge() {
        let img = GrayImage::from_fn(20, 5, |x, _| if x < 10 { Luma([0]) } else { Luma([255]) });
        let out = bilateral_filter(&img, 7, 55.0, 55.0);
        // Intensity gap of 255 gives negligible range weight across the edge
        assert!(out.get_pixel(9, 2)[0] < 10);
        assert!(out.get_pixel(10, 2)[0] > 245);
    }

    #[test]
    fn test_upscale_factor() {
        let img = GrayImage::new(7, 3);
        assert_eq!(upscale(&img, 2).dimensions(), (14, 6));
        assert_eq!(upscale(&img, 1).dimensions(), (7, 3));
    }
}
