use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use rollcount::detection::{CandidateDetector, PrimaryDetector, RawDetection};
use rollcount::models::{BoundingBox, LocatedCandidate, SampleRegion};
use rollcount::{DetectionMode, PipelineConfig, PipelineContext};

/// Background that classifies as orange_brown (HSV 13/179/100)
pub const ORANGE_BROWN: Rgb<u8> = Rgb([100, 60, 30]);

/// A uniform image with dark circular holes `(cx, cy, r)` punched into it.
pub fn roll_image(
    width: u32,
    height: u32,
    background: Rgb<u8>,
    holes: &[(i32, i32, i32)],
) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, background);
    for &(cx, cy, r) in holes {
        draw_filled_circle_mut(&mut img, (cx, cy), r, Rgb([0, 0, 0]));
    }
    img
}

/// 600x600 black image with a mid-gray 400x400 holder at (100, 100).
pub fn holder_image() -> RgbImage {
    let mut img = RgbImage::from_pixel(600, 600, Rgb([0, 0, 0]));
    draw_filled_rect_mut(&mut img, Rect::at(100, 100).of_size(400, 400), Rgb([128, 128, 128]));
    img
}

/// `count` 20x20 boxes on a 30 px grid, ten per row, starting at (5, 5).
pub fn grid_detections(count: usize) -> Vec<RawDetection> {
    (0..count)
        .map(|i| {
            let x = 5.0 + (i % 10) as f32 * 30.0;
            let y = 5.0 + (i / 10) as f32 * 30.0;
            RawDetection {
                bbox: [x, y, x + 20.0, y + 20.0],
                confidence: 0.8,
                class_label: "thread_roll".to_string(),
            }
        })
        .collect()
}

/// Learned detector double that always returns the same detections.
pub struct StubPrimary {
    pub detections: Vec<RawDetection>,
}

impl StubPrimary {
    pub fn boxed(detections: Vec<RawDetection>) -> Box<dyn PrimaryDetector> {
        Box::new(Self { detections })
    }
}

impl PrimaryDetector for StubPrimary {
    fn detect(
        &self,
        _image: &RgbImage,
        _confidence_threshold: f32,
    ) -> rollcount::Result<Vec<RawDetection>> {
        Ok(self.detections.clone())
    }
}

/// Candidate detector double returning `count` candidates tagged with `class`.
pub struct StubDetector {
    pub count: usize,
    pub class: &'static str,
}

impl CandidateDetector for StubDetector {
    fn detect(
        &self,
        _image: &RgbImage,
        holder: Option<&BoundingBox>,
        _context: &PipelineContext,
    ) -> rollcount::Result<Vec<LocatedCandidate>> {
        let located = grid_detections(self.count)
            .into_iter()
            .filter_map(|raw| {
                let [x1, y1, x2, y2] = raw.bbox;
                let bbox = BoundingBox::new(x1, y1, x2, y2)?;
                Some(LocatedCandidate {
                    bbox,
                    confidence: raw.confidence,
                    center: None,
                    source_class: self.class.to_string(),
                    sample: SampleRegion::Crop(bbox),
                })
            })
            .collect();
        Ok(rollcount::detection::region::retain_inside(located, holder))
    }

    fn name(&self) -> &str {
        self.class
    }
}

/// Default configuration with the given detection mode.
pub fn config_with_mode(mode: DetectionMode) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.hybrid.mode = mode;
    config
}

/// PNG-encode an image in memory.
pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes.into_inner()
}
