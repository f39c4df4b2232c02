//! Per-precision-level feature activation, weighting, and target scene count.

use std::collections::HashMap;

/// The eight feature families the extractor can compute, each toggled on
/// or off and weighted depending on the active precision level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    ColorHist,
    EdgeDensity,
    Texture,
    SpatialColor,
    PerceptualHash,
    Brightness,
    Contrast,
    ColorDiversity,
}

#[derive(Debug, Clone)]
pub struct PrecisionConfig {
    pub level: u8,
    pub active_features: Vec<Feature>,
    pub weights: HashMap<Feature, f64>,
    pub target_scene_count: usize,
}

impl PrecisionConfig {
    pub fn for_level(level: u8) -> Self {
        let level = level.clamp(1, 10);
        use Feature::*;

        let (active_features, target_scene_count): (Vec<Feature>, usize) = match level {
            1 => (vec![ColorHist], 4),
            2 => (vec![ColorHist, EdgeDensity], 4),
            3 => (vec![ColorHist, EdgeDensity, Brightness], 5),
            4 => (vec![ColorHist, EdgeDensity, Brightness, Contrast], 5),
            5 => (vec![ColorHist, EdgeDensity, Brightness, Contrast, ColorDiversity], 6),
            6 => (vec![ColorHist, EdgeDensity, Texture, Brightness, Contrast, ColorDiversity], 7),
            7 => (
                vec![ColorHist, EdgeDensity, Texture, SpatialColor, Brightness, Contrast, ColorDiversity],
                8,
            ),
            8 => (
                vec![
                    ColorHist, EdgeDensity, Texture, SpatialColor, PerceptualHash, Brightness, Contrast,
                    ColorDiversity,
                ],
                10,
            ),
            _ => (
                vec![
                    ColorHist, EdgeDensity, Texture, SpatialColor, PerceptualHash, Brightness, Contrast,
                    ColorDiversity,
                ],
                10,
            ),
        };

        let base_weights: HashMap<Feature, f64> = match level {
            1 => [(ColorHist, 1.0)].into_iter().collect(),
            2 => [(ColorHist, 0.7), (EdgeDensity, 0.3)].into_iter().collect(),
            3 => [(ColorHist, 0.6), (EdgeDensity, 0.25), (Brightness, 0.15)].into_iter().collect(),
            4 => [(ColorHist, 0.4), (EdgeDensity, 0.3), (Brightness, 0.2), (Contrast, 0.1)]
                .into_iter()
                .collect(),
            5 => [
                (ColorHist, 0.35),
                (EdgeDensity, 0.25),
                (Brightness, 0.15),
                (Contrast, 0.15),
                (ColorDiversity, 0.1),
            ]
            .into_iter()
            .collect(),
            6 => [
                (ColorHist, 0.3),
                (EdgeDensity, 0.2),
                (Texture, 0.2),
                (Brightness, 0.1),
                (Contrast, 0.1),
                (ColorDiversity, 0.1),
            ]
            .into_iter()
            .collect(),
            7 => [
                (ColorHist, 0.25),
                (EdgeDensity, 0.2),
                (Texture, 0.2),
                (SpatialColor, 0.15),
                (Brightness, 0.08),
                (Contrast, 0.07),
                (ColorDiversity, 0.05),
            ]
            .into_iter()
            .collect(),
            8 => [
                (ColorHist, 0.25),
                (EdgeDensity, 0.2),
                (Texture, 0.2),
                (SpatialColor, 0.15),
                (PerceptualHash, 0.08),
                (Brightness, 0.05),
                (Contrast, 0.04),
                (ColorDiversity, 0.03),
            ]
            .into_iter()
            .collect(),
            _ => [
                (ColorHist, 0.25),
                (EdgeDensity, 0.20),
                (Texture, 0.20),
                (SpatialColor, 0.15),
                (PerceptualHash, 0.10),
                (Brightness, 0.05),
                (Contrast, 0.03),
                (ColorDiversity, 0.02),
            ]
            .into_iter()
            .collect(),
        };

        let total: f64 = base_weights.values().sum();
        let weights = if total > 0.0 {
            base_weights.into_iter().map(|(k, v)| (k, v / total)).collect()
        } else {
            base_weights
        };

        Self {
            level,
            active_features,
            weights,
            target_scene_count,
        }
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.active_features.contains(&feature)
    }

    /// Downsample target for feature extraction, faster/coarser at low
    /// precision, detailed at high precision.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        if self.level <= 3 {
            (160, 120)
        } else if self.level >= 8 {
            (320, 240)
        } else {
            (240, 180)
        }
    }

    pub fn color_hist_bins(&self) -> usize {
        if self.level <= 3 {
            16
        } else if self.level <= 7 {
            32
        } else {
            64
        }
    }

    pub fn lbp_points(&self) -> u32 {
        if self.level <= 3 {
            6
        } else if self.level >= 8 {
            12
        } else {
            8
        }
    }

    pub fn texture_bins(&self) -> usize {
        if self.level <= 5 {
            16
        } else {
            32
        }
    }

    pub fn spatial_grid_size(&self) -> usize {
        if self.level <= 3 {
            2
        } else if self.level <= 6 {
            3
        } else {
            4
        }
    }

    pub fn spatial_bins(&self) -> usize {
        if self.level <= 5 {
            8
        } else {
            16
        }
    }

    pub fn hash_size(&self) -> u32 {
        if self.level <= 3 {
            4
        } else if self.level <= 7 {
            8
        } else {
            16
        }
    }

    /// FFmpeg `-q:v` still-frame quality (lower number = higher quality).
    pub fn frame_quality(&self) -> &'static str {
        if self.level <= 3 {
            "5"
        } else if self.level >= 8 {
            "1"
        } else {
            "2"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for level in 1..=10 {
            let cfg = PrecisionConfig::for_level(level);
            let total: f64 = cfg.weights.values().sum();
            assert!((total - 1.0).abs() < 1e-9, "level {level} weights sum to {total}");
        }
    }

    #[test]
    fn target_counts_match_precision_table() {
        assert_eq!(PrecisionConfig::for_level(1).target_scene_count, 4);
        assert_eq!(PrecisionConfig::for_level(5).target_scene_count, 6);
        assert_eq!(PrecisionConfig::for_level(10).target_scene_count, 10);
    }

    #[test]
    fn out_of_range_level_clamps() {
        assert_eq!(PrecisionConfig::for_level(0).level, 1);
        assert_eq!(PrecisionConfig::for_level(255).level, 10);
    }
}
