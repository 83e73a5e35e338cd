use super::hsv::{Hsv, quantize, rgb_to_hsv};
use super::kmeans::KMeans;
use super::rules::ColorRuleTable;
use crate::config::ColorConfig;
use crate::models::{ColorLabel, SampleRegion};
use image::RgbImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

/// Dominant color of a sample and the label it maps to
#[derive(Debug, Clone, PartialEq)]
pub struct ColorReading {
    pub rgb: [u8; 3],
    pub hsv: Hsv,
    pub label: ColorLabel,
    /// Pixels that went into the centroid after subsampling
    pub samples: usize,
}

/// Maps a pixel sample to a color label.
///
/// The dominant color is the centroid of a one-cluster k-means fit over
/// at most `sample_cap` pixels; its HSV value is looked up in the rule
/// table.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    table: ColorRuleTable,
    sample_cap: usize,
    seed: u64,
    n_init: usize,
    max_iter: usize,
}

impl ColorClassifier {
    pub fn new(config: &ColorConfig) -> Self {
        Self {
            table: ColorRuleTable::new(config.rules.clone()),
            sample_cap: config.sample_cap.max(1),
            seed: config.seed,
            n_init: config.n_init,
            max_iter: config.max_iter,
        }
    }

    pub fn table(&self) -> &ColorRuleTable {
        &self.table
    }

    /// Label for a pixel sample; empty samples are `other`
    pub fn classify(&self, pixels: &[[u8; 3]]) -> ColorLabel {
        self.analyze(pixels)
            .map(|reading| reading.label)
            .unwrap_or_else(ColorLabel::other)
    }

    /// Label for a region of `image`
    pub fn classify_region(&self, image: &RgbImage, region: &SampleRegion) -> ColorLabel {
        self.classify(&sample_pixels(image, region))
    }

    pub fn analyze(&self, pixels: &[[u8; 3]]) -> Option<ColorReading> {
        let rgb = self.dominant_color(pixels)?;
        let hsv = rgb_to_hsv(rgb);
        Some(ColorReading {
            rgb,
            hsv,
            label: self.table.classify(hsv),
            samples: pixels.len().min(self.sample_cap),
        })
    }

    /// Single-cluster centroid of the (subsampled) pixels
    pub fn dominant_color(&self, pixels: &[[u8; 3]]) -> Option<[u8; 3]> {
        let samples: Vec<[f64; 3]> = self
            .subsample(pixels)
            .into_iter()
            .map(|p| p.map(f64::from))
            .collect();

        let fit = KMeans::new(1, self.seed)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
            .fit(&samples)?;

        fit.centroids.first().map(|c| quantize(*c))
    }

    /// Uniform sample without replacement when over the cap
    fn subsample(&self, pixels: &[[u8; 3]]) -> Vec<[u8; 3]> {
        if pixels.len() <= self.sample_cap {
            return pixels.to_vec();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut picked = index::sample(&mut rng, pixels.len(), self.sample_cap).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| pixels[i]).collect()
    }
}

/// Collect the pixels of a region in row-major order.
///
/// Crops use integer (truncated) pixel bounds; annuli keep pixels whose
/// distance to the center lies in `[inner_radius, outer_radius]`. Parts
/// outside the image are ignored.
pub fn sample_pixels(image: &RgbImage, region: &SampleRegion) -> Vec<[u8; 3]> {
    let (width, height) = image.dimensions();

    match *region {
        SampleRegion::Crop(bbox) => {
            let x1 = (bbox.x1.max(0.0) as u32).min(width);
            let y1 = (bbox.y1.max(0.0) as u32).min(height);
            let x2 = (bbox.x2.max(0.0) as u32).min(width);
            let y2 = (bbox.y2.max(0.0) as u32).min(height);

            let area = x2.saturating_sub(x1) * y2.saturating_sub(y1);
            let mut pixels = Vec::with_capacity(area as usize);
            for y in y1..y2 {
                for x in x1..x2 {
                    pixels.push(image.get_pixel(x, y).0);
                }
            }
            pixels
        }
        SampleRegion::Annulus {
            cx,
            cy,
            inner_radius,
            outer_radius,
        } => {
            if outer_radius < inner_radius || outer_radius < 0.0 {
                return Vec::new();
            }

            let x_lo = (cx - outer_radius).floor().max(0.0) as u32;
            let y_lo = (cy - outer_radius).floor().max(0.0) as u32;
            let x_hi = ((cx + outer_radius).ceil().max(-1.0) + 1.0).min(width as f32) as u32;
            let y_hi = ((cy + outer_radius).ceil().max(-1.0) + 1.0).min(height as f32) as u32;

            let inner_sq = inner_radius * inner_radius;
            let outer_sq = outer_radius * outer_radius;
            let mut pixels = Vec::new();
            for y in y_lo..y_hi {
                let dy = y as f32 - cy;
                for x in x_lo..x_hi {
                    let dx = x as f32 - cx;
                    let d_sq = dx * dx + dy * dy;
                    if d_sq >= inner_sq && d_sq <= outer_sq {
                        pixels.push(image.get_pixel(x, y).0);
                    }
                }
            }
            pixels
        }
    }
}
