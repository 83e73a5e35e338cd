use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Axis-aligned box in pixel coordinates, `x1 < x2` and `y1 < y2`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Build a box, rejecting empty or inverted extents
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
        let finite = x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite();
        if finite && x1 < x2 && y1 < y2 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    /// Square box of half-side `half_extent` around a center, not clipped
    pub fn around(cx: f32, cy: f32, half_extent: f32) -> Option<Self> {
        Self::new(cx - half_extent, cy - half_extent, cx + half_extent, cy + half_extent)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Inclusive containment test
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    /// Clip to `[0, width] x [0, height]`; `None` when nothing is left
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        let (w, h) = (width as f32, height as f32);
        Self::new(
            self.x1.clamp(0.0, w),
            self.y1.clamp(0.0, h),
            self.x2.clamp(0.0, w),
            self.y2.clamp(0.0, h),
        )
    }
}

/// Color label assigned by the rule table.
///
/// The set of labels is defined by configuration; the built-in table uses
/// the constructors below. [`ColorLabel::other`] is reserved for "no rule
/// matched" and degenerate regions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorLabel(String);

impl ColorLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn yellow() -> Self {
        Self::new("yellow")
    }

    pub fn orange_brown() -> Self {
        Self::new("orange_brown")
    }

    pub fn white() -> Self {
        Self::new("white")
    }

    pub fn pink() -> Self {
        Self::new("pink")
    }

    pub fn orange() -> Self {
        Self::new("orange")
    }

    pub fn other() -> Self {
        Self::new("other")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_other(&self) -> bool {
        self.0 == "other"
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pixels to sample when extracting a candidate's dominant color
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleRegion {
    /// Every pixel of the box (learned-detector candidates)
    Crop(BoundingBox),
    /// Ring around a hole center, excluding the hole itself
    Annulus {
        cx: f32,
        cy: f32,
        inner_radius: f32,
        outer_radius: f32,
    },
}

/// A detector hit before numbering and color assignment
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedCandidate {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub center: Option<(u32, u32)>,
    pub source_class: String,
    pub sample: SampleRegion,
}

impl LocatedCandidate {
    /// Point used for holder containment: the explicit center, else the bbox center
    pub fn anchor(&self) -> (f32, f32) {
        match self.center {
            Some((x, y)) => (x as f32, y as f32),
            None => self.bbox.center(),
        }
    }
}

/// A counted object with its color label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u32,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub color: ColorLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<(u32, u32)>,
    #[serde(rename = "class")]
    pub source_class: String,
}

/// Which detector produced the final candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Primary,
    Fallback,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSource::Primary => f.write_str("primary"),
            DetectionSource::Fallback => f.write_str("fallback"),
        }
    }
}

/// Counting result for one image.
///
/// Built only by [`crate::aggregate::aggregate`], so `total_count` always
/// equals the number of detections and the per-color counts sum to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    total_count: usize,
    color_counts: BTreeMap<ColorLabel, usize>,
    detections: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<DetectionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    holder: Option<BoundingBox>,
}

impl DetectionResult {
    pub(crate) fn from_parts(
        color_counts: BTreeMap<ColorLabel, usize>,
        detections: Vec<Candidate>,
    ) -> Self {
        Self {
            total_count: detections.len(),
            color_counts,
            detections,
            source: None,
            holder: None,
        }
    }

    pub(crate) fn with_provenance(
        mut self,
        source: DetectionSource,
        holder: Option<BoundingBox>,
    ) -> Self {
        self.source = Some(source);
        self.holder = holder;
        self
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn color_counts(&self) -> &BTreeMap<ColorLabel, usize> {
        &self.color_counts
    }

    /// Count for one label, zero when the label was not observed
    pub fn count_of(&self, label: &ColorLabel) -> usize {
        self.color_counts.get(label).copied().unwrap_or(0)
    }

    pub fn detections(&self) -> &[Candidate] {
        &self.detections
    }

    pub fn source(&self) -> Option<DetectionSource> {
        self.source
    }

    pub fn holder(&self) -> Option<&BoundingBox> {
        self.holder.as_ref()
    }
}
