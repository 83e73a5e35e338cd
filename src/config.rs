//! Tunable parameters for the counting pipeline.
//!
//! Every threshold the pipeline uses lives here so that a deployment can be
//! recalibrated without code changes. The defaults are tuned for one rig
//! (hole radius 6-22 px, roughly 100 rolls per cage) and will usually need
//! adjusting for other cameras or lighting.
//!
//! ```no_run
//! use rollcount::PipelineConfig;
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_json_file(Path::new("rollcount.json"))?;
//! config.validate()?;
//! # Ok::<(), rollcount::Error>(())
//! ```

use crate::color::rules::{ColorRule, default_rules};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Primary/fallback selection policy
    pub hybrid: HybridConfig,

    /// Holder (cage) boundary localization
    pub holder: HolderConfig,

    /// Geometric fallback detector
    pub circles: CircleConfig,

    /// Dominant-color extraction and the rule table
    pub color: ColorConfig,
}

/// Which detector(s) a pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Learned detector first, circle detector when coverage is too low
    #[default]
    Hybrid,
    /// Learned detector only
    PrimaryOnly,
    /// Circle detector only; no learned detector is required
    FallbackOnly,
}

impl DetectionMode {
    pub fn requires_primary(&self) -> bool {
        !matches!(self, DetectionMode::FallbackOnly)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub mode: DetectionMode,

    /// Primary output is accepted only when it has strictly more candidates
    pub coverage_threshold: usize,

    /// Confidence threshold handed to the learned detector
    pub primary_confidence: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Hybrid,
            coverage_threshold: 50,
            primary_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HolderConfig {
    pub enabled: bool,

    /// Canny low threshold
    pub canny_low: f32,

    /// Canny high threshold
    pub canny_high: f32,

    /// Edge dilation radius (0 disables), closes one-pixel gaps in edge loops
    pub edge_dilation: u8,

    /// Contours must enclose strictly more than this many square pixels
    pub min_area: f64,

    /// Inclusive bounds on bounding-rectangle width / height
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
}

impl Default for HolderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_dilation: 1,
            min_area: 100_000.0,
            min_aspect_ratio: 0.7,
            max_aspect_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    /// Luminance below this is treated as hole
    pub dark_threshold: u8,

    /// Radius of the square structuring element (2 gives 5x5)
    pub morph_radius: u8,

    /// Inverse accumulator resolution
    pub dp: f32,

    /// Minimum distance between accepted circle centers
    pub min_dist: f32,

    /// Canny high threshold for the Hough edge map (low is half of it)
    pub canny_threshold: f32,

    /// Votes a center needs to be considered
    pub accumulator_threshold: f32,

    /// Hole radius band in pixels, inclusive
    pub min_radius: u32,
    pub max_radius: u32,

    /// Share of the directions around a center that must hold rim edge
    /// pixels at the chosen radius; corners and straight edges fall short
    pub min_rim_coverage: f32,

    /// Roll half-extent as a multiple of the hole radius
    pub bbox_multiplier: f32,

    /// Gap between the hole edge and the sampled ring
    pub annulus_margin: f32,

    /// Outer sampling radius as a multiple of the hole radius
    pub annulus_multiplier: f32,

    /// Confidence reported for circle-derived candidates
    pub confidence: f32,

    /// Class reported for circle-derived candidates
    pub class_name: String,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 60,
            morph_radius: 2,
            dp: 1.2,
            min_dist: 33.0,
            canny_threshold: 50.0,
            accumulator_threshold: 34.5,
            min_radius: 6,
            max_radius: 22,
            min_rim_coverage: 0.75,
            bbox_multiplier: 7.0,
            annulus_margin: 5.0,
            annulus_multiplier: 6.0,
            confidence: 0.95,
            class_name: "thread_roll".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Maximum number of pixels fed to the clustering step
    pub sample_cap: usize,

    /// Seed for subsampling and k-means initialization
    pub seed: u64,

    /// k-means restarts; the lowest-inertia fit wins
    pub n_init: usize,

    /// Lloyd iteration cap per restart
    pub max_iter: usize,

    /// Ordered rule table
    pub rules: Vec<ColorRule>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            sample_cap: 500,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            rules: default_rules(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hybrid: HybridConfig::default(),
            holder: HolderConfig::default(),
            circles: CircleConfig::default(),
            color: ColorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys fall back to defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Serialize to pretty JSON, e.g. to seed a deployment config file
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> Result<()> {
        let hybrid = &self.hybrid;
        if !(0.0..=1.0).contains(&hybrid.primary_confidence) {
            return Err(Error::invalid_config(
                "hybrid.primary_confidence",
                hybrid.primary_confidence,
            ));
        }

        let holder = &self.holder;
        if holder.canny_low > holder.canny_high {
            return Err(Error::invalid_config("holder.canny_low", holder.canny_low));
        }
        if holder.min_aspect_ratio <= 0.0 || holder.min_aspect_ratio > holder.max_aspect_ratio {
            return Err(Error::invalid_config(
                "holder.min_aspect_ratio",
                holder.min_aspect_ratio,
            ));
        }

        let circles = &self.circles;
        if !(circles.dp > 0.0) {
            return Err(Error::invalid_config("circles.dp", circles.dp));
        }
        if circles.min_radius == 0 || circles.min_radius > circles.max_radius {
            return Err(Error::invalid_config("circles.min_radius", circles.min_radius));
        }
        if !(circles.min_rim_coverage > 0.0 && circles.min_rim_coverage <= 1.0) {
            return Err(Error::invalid_config(
                "circles.min_rim_coverage",
                circles.min_rim_coverage,
            ));
        }
        if !(circles.min_dist > 0.0) {
            return Err(Error::invalid_config("circles.min_dist", circles.min_dist));
        }
        if !(circles.canny_threshold > 0.0) {
            return Err(Error::invalid_config(
                "circles.canny_threshold",
                circles.canny_threshold,
            ));
        }
        if !(circles.bbox_multiplier > 0.0) {
            return Err(Error::invalid_config(
                "circles.bbox_multiplier",
                circles.bbox_multiplier,
            ));
        }
        if circles.annulus_margin < 0.0 || !(circles.annulus_multiplier > 0.0) {
            return Err(Error::invalid_config(
                "circles.annulus_multiplier",
                circles.annulus_multiplier,
            ));
        }
        if !(0.0..=1.0).contains(&circles.confidence) {
            return Err(Error::invalid_config("circles.confidence", circles.confidence));
        }

        let color = &self.color;
        if color.sample_cap == 0 {
            return Err(Error::invalid_config("color.sample_cap", color.sample_cap));
        }
        if color.n_init == 0 {
            return Err(Error::invalid_config("color.n_init", color.n_init));
        }
        for rule in &color.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "hybrid": { "coverage_threshold": 80 } }"#).unwrap();

        assert_eq!(config.hybrid.coverage_threshold, 80);
        assert_eq!(config.hybrid.mode, DetectionMode::Hybrid);
        assert_eq!(config.circles.max_radius, 22);
        assert_eq!(config.color.rules.len(), default_rules().len());
    }

    #[test]
    fn test_validate_rejects_inverted_radius_band() {
        let mut config = PipelineConfig::default();
        config.circles.min_radius = 30;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig { ref parameter, .. } if parameter == "circles.min_radius"
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }
}
