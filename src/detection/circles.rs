//! Geometric fallback: find rolls by their dark center holes.

use super::CandidateDetector;
use super::hough::{Circle, HoughParams, hough_circles};
use super::{preprocessing, region};
use crate::config::CircleConfig;
use crate::error::Result;
use crate::models::{BoundingBox, LocatedCandidate, SampleRegion};
use crate::pipeline::PipelineContext;
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

/// Detects rolls from circular holes and reconstructs their extent
#[derive(Debug, Clone)]
pub struct FallbackCircleDetector {
    config: CircleConfig,
}

impl FallbackCircleDetector {
    pub fn new(config: &CircleConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn hough_params(&self) -> HoughParams {
        HoughParams {
            dp: self.config.dp,
            min_dist: self.config.min_dist,
            canny_threshold: self.config.canny_threshold,
            accumulator_threshold: self.config.accumulator_threshold,
            min_radius: self.config.min_radius,
            max_radius: self.config.max_radius,
            min_rim_coverage: self.config.min_rim_coverage,
        }
    }

    /// Dark-hole mask: inverse threshold, then closing and opening
    pub fn hole_mask(&self, gray: &GrayImage) -> GrayImage {
        let mask = preprocessing::threshold_inverse(gray, self.config.dark_threshold);
        preprocessing::clean_mask(&mask, self.config.morph_radius)
    }

    /// Circles in Hough order
    pub fn find_circles(&self, gray: &GrayImage) -> Vec<Circle> {
        hough_circles(gray, &self.hough_params())
    }

    /// Turn a hole into a roll candidate, `None` if nothing remains after clipping
    pub fn locate(&self, circle: &Circle, width: u32, height: u32) -> Option<LocatedCandidate> {
        let cx = circle.x.round().max(0.0) as u32;
        let cy = circle.y.round().max(0.0) as u32;
        let r = circle.radius.round().max(1.0) as u32;

        let bbox = roll_bbox(cx, cy, r, self.config.bbox_multiplier)?.clip(width, height)?;

        Some(LocatedCandidate {
            bbox,
            confidence: self.config.confidence,
            center: Some((cx, cy)),
            source_class: self.config.class_name.clone(),
            sample: SampleRegion::Annulus {
                cx: cx as f32,
                cy: cy as f32,
                inner_radius: r as f32 + self.config.annulus_margin,
                outer_radius: (r as f32 * self.config.annulus_multiplier).floor(),
            },
        })
    }
}

/// Roll extent around a hole, before clipping.
///
/// The half-extent is `floor(r * multiplier)`: a hole of radius 10 at
/// (100, 100) with multiplier 7 gives (30, 30, 170, 170).
pub fn roll_bbox(cx: u32, cy: u32, r: u32, multiplier: f32) -> Option<BoundingBox> {
    let half = (r as f32 * multiplier).floor();
    BoundingBox::around(cx as f32, cy as f32, half)
}

impl CandidateDetector for FallbackCircleDetector {
    fn detect(
        &self,
        image: &RgbImage,
        holder: Option<&BoundingBox>,
        context: &PipelineContext,
    ) -> Result<Vec<LocatedCandidate>> {
        let (width, height) = image.dimensions();
        let gray = preprocessing::to_grayscale(image);

        let mask = self.hole_mask(&gray);
        debug!(
            dark_fraction = preprocessing::foreground_fraction(&mask),
            "hole mask computed"
        );
        context.save_debug("02_hole_mask", &DynamicImage::ImageLuma8(mask))?;

        let circles = self.find_circles(&gray);
        debug!(circles = circles.len(), "hough search finished");

        let mut located = Vec::with_capacity(circles.len());
        for circle in &circles {
            let center = (circle.x.round(), circle.y.round());
            if !region::inside(center, holder) {
                continue;
            }
            if let Some(candidate) = self.locate(circle, width, height) {
                located.push(candidate);
            }
        }

        debug!(
            kept = located.len(),
            discarded = circles.len() - located.len(),
            "circle candidates inside holder"
        );
        Ok(located)
    }

    fn name(&self) -> &str {
        "Circle Detection"
    }
}
