//! Per-frame feature extraction and the weighted distance matrix that
//! drives clustering.

use std::path::Path;

use image::{imageops::FilterType, GenericImageView, RgbImage};
use image_hasher::{HashAlg, HasherConfig, ImageHash};

use crate::error::{MediaError, MediaResult};

use super::precision::{Feature, PrecisionConfig};

/// All feature families for one frame, each present only if active at the
/// current precision level.
#[derive(Debug, Clone, Default)]
pub struct FrameFeatures {
    pub color_hist: Option<Vec<f64>>,
    pub edge_density: Option<f64>,
    pub texture: Option<Vec<f64>>,
    pub spatial_color: Option<Vec<f64>>,
    pub phash: Option<ImageHash>,
    pub brightness: Option<Vec<f64>>,
    pub contrast: Option<f64>,
    pub color_diversity: Option<f64>,
}

pub fn extract(path: &Path, precision: &PrecisionConfig) -> MediaResult<FrameFeatures> {
    let img = image::open(path).map_err(|e| MediaError::internal(format!("decode failed: {e}")))?;
    let (w, h) = precision.frame_dimensions();
    let rgb = image::imageops::resize(&img.to_rgb8(), w, h, FilterType::Triangle);
    let hsv = to_hsv(&rgb);
    let gray: Vec<f64> = hsv.iter().map(|(_, _, v)| *v).collect();

    let mut features = FrameFeatures::default();

    if precision.has(Feature::ColorHist) {
        features.color_hist = Some(color_histogram(&hsv, precision.color_hist_bins()));
    }
    if precision.has(Feature::EdgeDensity) {
        features.edge_density = Some(edge_density(&gray, w as usize, h as usize, precision.level));
    }
    if precision.has(Feature::Texture) {
        features.texture = Some(lbp_histogram(&gray, w as usize, h as usize, precision.lbp_points(), precision.texture_bins()));
    }
    if precision.has(Feature::SpatialColor) {
        features.spatial_color = Some(spatial_color(
            &hsv,
            w as usize,
            h as usize,
            precision.spatial_grid_size(),
            precision.spatial_bins(),
        ));
    }
    if precision.has(Feature::PerceptualHash) {
        features.phash = Some(perceptual_hash(&rgb, precision.hash_size()));
    }
    if precision.has(Feature::Brightness) {
        features.brightness = Some(brightness_stats(&gray, precision.level));
    }
    if precision.has(Feature::Contrast) {
        features.contrast = Some(contrast(&gray));
    }
    if precision.has(Feature::ColorDiversity) {
        features.color_diversity = Some(color_diversity(&rgb, precision.level));
    }

    Ok(features)
}

/// HSV triples, each channel in `0.0..1.0`.
fn to_hsv(img: &RgbImage) -> Vec<(f64, f64, f64)> {
    img.pixels()
        .map(|p| {
            let (r, g, b) = (p[0] as f64 / 255.0, p[1] as f64 / 255.0, p[2] as f64 / 255.0);
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            let delta = max - min;

            let h = if delta == 0.0 {
                0.0
            } else if max == r {
                60.0 * (((g - b) / delta) % 6.0)
            } else if max == g {
                60.0 * (((b - r) / delta) + 2.0)
            } else {
                60.0 * (((r - g) / delta) + 4.0)
            };
            let h = if h < 0.0 { h + 360.0 } else { h } / 360.0;
            let s = if max == 0.0 { 0.0 } else { delta / max };
            (h, s, max)
        })
        .collect()
}

fn histogram(values: impl Iterator<Item = f64>, bins: usize) -> Vec<f64> {
    let mut hist = vec![0.0; bins];
    let mut total = 0.0;
    for v in values {
        let idx = ((v.clamp(0.0, 0.999999)) * bins as f64) as usize;
        hist[idx.min(bins - 1)] += 1.0;
        total += 1.0;
    }
    if total > 0.0 {
        for h in hist.iter_mut() {
            *h /= total;
        }
    }
    hist
}

fn color_histogram(hsv: &[(f64, f64, f64)], bins: usize) -> Vec<f64> {
    let h_hist = histogram(hsv.iter().map(|(h, _, _)| *h), bins);
    let s_hist = histogram(hsv.iter().map(|(_, s, _)| *s), bins);
    let v_hist = histogram(hsv.iter().map(|(_, _, v)| *v), bins);
    [h_hist, s_hist, v_hist].concat()
}

fn edge_density(gray: &[f64], w: usize, h: usize, precision_level: u8) -> f64 {
    let (low, high) = if precision_level <= 3 {
        (100.0 / 255.0, 200.0 / 255.0)
    } else if precision_level >= 8 {
        (30.0 / 255.0, 100.0 / 255.0)
    } else {
        (50.0 / 255.0, 150.0 / 255.0)
    };

    let mut edge_pixels = 0usize;
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let gx = gray[y * w + x + 1] - gray[y * w + x - 1];
            let gy = gray[(y + 1) * w + x] - gray[(y - 1) * w + x];
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude > low && magnitude <= high.max(low + f64::EPSILON) || magnitude > high {
                edge_pixels += 1;
            }
        }
    }
    edge_pixels as f64 / (w * h).max(1) as f64
}

/// Local Binary Pattern histogram, sampling `num_points` neighbors on a
/// unit-radius circle per original pixel, matching the source's rotation
/// invariant-free LBP (no uniform-pattern reduction).
fn lbp_histogram(gray: &[f64], w: usize, h: usize, num_points: u32, bins: usize) -> Vec<f64> {
    let mut codes = Vec::with_capacity(w * h);
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let center = gray[y * w + x];
            let mut code: u32 = 0;
            for k in 0..num_points {
                let angle = 2.0 * std::f64::consts::PI * k as f64 / num_points as f64;
                let sx = (x as f64 + angle.cos()).round() as isize;
                let sy = (y as f64 + angle.sin()).round() as isize;
                if sx >= 0 && sy >= 0 && (sx as usize) < w && (sy as usize) < h {
                    let neighbor = gray[sy as usize * w + sx as usize];
                    if neighbor >= center {
                        code |= 1 << k;
                    }
                }
            }
            codes.push(code as f64);
        }
    }
    histogram(codes.into_iter().map(|c| c / 4096.0), bins)
}

fn spatial_color(hsv: &[(f64, f64, f64)], w: usize, h: usize, grid: usize, bins: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(grid * grid * bins);
    for gy in 0..grid {
        for gx in 0..grid {
            let y1 = gy * h / grid;
            let y2 = ((gy + 1) * h / grid).max(y1 + 1);
            let x1 = gx * w / grid;
            let x2 = ((gx + 1) * w / grid).max(x1 + 1);

            let mut cell_h = Vec::new();
            for y in y1..y2.min(h) {
                for x in x1..x2.min(w) {
                    cell_h.push(hsv[y * w + x].0);
                }
            }
            out.extend(histogram(cell_h.into_iter(), bins));
        }
    }
    out
}

fn perceptual_hash(img: &RgbImage, hash_size: u32) -> ImageHash {
    let hasher = HasherConfig::new()
        .hash_size(hash_size, hash_size)
        .hash_alg(HashAlg::Gradient)
        .to_hasher();
    hasher.hash_image(img)
}

fn brightness_stats(gray: &[f64], precision_level: u8) -> Vec<f64> {
    let n = gray.len().max(1) as f64;
    let mean = gray.iter().sum::<f64>() / n;
    let variance = gray.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if precision_level >= 7 {
        let min = gray.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = gray.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        vec![mean, std, min, max]
    } else {
        vec![mean, std]
    }
}

fn contrast(gray: &[f64]) -> f64 {
    let n = gray.len().max(1) as f64;
    let mean = gray.iter().sum::<f64>() / n;
    (gray.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

fn color_diversity(img: &RgbImage, precision_level: u8) -> f64 {
    let sample_rate = if precision_level <= 3 { 4 } else { 1 };
    let mut seen = std::collections::HashSet::new();
    let mut total = 0usize;

    for (x, y, pixel) in img.enumerate_pixels() {
        if x % sample_rate != 0 || y % sample_rate != 0 {
            continue;
        }
        seen.insert(pixel.0);
        total += 1;
    }
    seen.len() as f64 / total.max(1) as f64
}

/// Euclidean distance between two equal-length vectors.
fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Build the weighted distance matrix across all scenes, normalizing each
/// feature's raw distance submatrix by its own max before applying the
/// precision-level weight, mirroring `_calculate_precision_distance`.
pub fn weighted_distance_matrix(features: &[FrameFeatures], precision: &PrecisionConfig) -> Vec<Vec<f64>> {
    let n = features.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for &feature in &precision.active_features {
        let Some(&weight) = precision.weights.get(&feature) else { continue };
        let mut raw = vec![vec![0.0; n]; n];
        let mut max_dist = 0.0_f64;

        for i in 0..n {
            for j in (i + 1)..n {
                let d = feature_distance(feature, &features[i], &features[j]);
                raw[i][j] = d;
                raw[j][i] = d;
                if d > max_dist {
                    max_dist = d;
                }
            }
        }

        if max_dist > 0.0 {
            for i in 0..n {
                for j in 0..n {
                    matrix[i][j] += weight * (raw[i][j] / max_dist);
                }
            }
        }
    }

    matrix
}

fn feature_distance(feature: Feature, a: &FrameFeatures, b: &FrameFeatures) -> f64 {
    match feature {
        Feature::ColorHist => match (&a.color_hist, &b.color_hist) {
            (Some(x), Some(y)) => euclidean(x, y),
            _ => 0.0,
        },
        Feature::EdgeDensity => match (a.edge_density, b.edge_density) {
            (Some(x), Some(y)) => (x - y).abs(),
            _ => 0.0,
        },
        Feature::Texture => match (&a.texture, &b.texture) {
            (Some(x), Some(y)) => euclidean(x, y),
            _ => 0.0,
        },
        Feature::SpatialColor => match (&a.spatial_color, &b.spatial_color) {
            (Some(x), Some(y)) => euclidean(x, y),
            _ => 0.0,
        },
        Feature::PerceptualHash => match (&a.phash, &b.phash) {
            (Some(x), Some(y)) => x.dist(y) as f64,
            _ => 0.0,
        },
        Feature::Brightness => match (&a.brightness, &b.brightness) {
            (Some(x), Some(y)) => euclidean(x, y),
            _ => 0.0,
        },
        Feature::Contrast => match (a.contrast, b.contrast) {
            (Some(x), Some(y)) => (x - y).abs(),
            _ => 0.0,
        },
        Feature::ColorDiversity => match (a.color_diversity, b.color_diversity) {
            (Some(x), Some(y)) => (x - y).abs(),
            _ => 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_normalizes_to_unit_sum() {
        let hist = histogram([0.1, 0.2, 0.9, 0.95].into_iter(), 4);
        let sum: f64 = hist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identical_features_have_zero_distance() {
        let a = FrameFeatures {
            color_hist: Some(vec![0.1, 0.2, 0.3]),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(feature_distance(Feature::ColorHist, &a, &b), 0.0);
    }
}
