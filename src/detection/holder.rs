//! Holder (cage) boundary localization.
//!
//! The holder is taken to be the largest near-square outer contour in the
//! edge map. Finding none is normal and simply disables region filtering.

use super::contours::{Contour, find_external_contours};
use super::preprocessing;
use crate::config::HolderConfig;
use crate::models::BoundingBox;
use image::{GrayImage, RgbImage};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HolderLocalizer {
    config: HolderConfig,
}

impl HolderLocalizer {
    pub fn new(config: &HolderConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Holder boundary of an RGB image, if one qualifies
    pub fn locate(&self, image: &RgbImage) -> Option<BoundingBox> {
        if !self.config.enabled {
            return None;
        }
        let gray = preprocessing::to_grayscale(image);
        self.locate_gray(&gray)
    }

    pub fn locate_gray(&self, gray: &GrayImage) -> Option<BoundingBox> {
        if !self.config.enabled {
            return None;
        }
        self.locate_in_edges(&self.edge_map(gray))
    }

    /// Holder boundary from an edge map produced by [`Self::edge_map`]
    pub fn locate_in_edges(&self, edges: &GrayImage) -> Option<BoundingBox> {
        if !self.config.enabled {
            return None;
        }
        let contours = find_external_contours(edges);
        let best = self.select(&contours)?;

        let bbox = BoundingBox::new(
            best.min_x as f32,
            best.min_y as f32,
            (best.min_x + best.width() as i32) as f32,
            (best.min_y + best.height() as i32) as f32,
        );
        if let Some(b) = &bbox {
            debug!(
                x1 = b.x1,
                y1 = b.y1,
                x2 = b.x2,
                y2 = b.y2,
                area = best.area(),
                "holder boundary found"
            );
        }
        bbox
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Dilated Canny edges the contours are traced on
    pub fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let edges =
            preprocessing::detect_edges(gray, self.config.canny_low, self.config.canny_high);
        preprocessing::dilate_edges(&edges, self.config.edge_dilation)
    }

    /// Largest contour above the minimum area with an acceptable aspect ratio
    fn select<'a>(&self, contours: &'a [Contour]) -> Option<&'a Contour> {
        let mut best: Option<(&Contour, f64)> = None;

        for contour in contours {
            let area = contour.area();
            if area <= self.config.min_area {
                continue;
            }
            if best.is_some_and(|(_, best_area)| area <= best_area) {
                continue;
            }
            let aspect = contour.aspect_ratio();
            if aspect >= self.config.min_aspect_ratio && aspect <= self.config.max_aspect_ratio {
                best = Some((contour, area));
            }
        }

        best.map(|(contour, _)| contour)
    }
}
