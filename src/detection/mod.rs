pub mod circles;
pub mod contours;
pub mod holder;
pub mod hough;
pub mod hybrid;
pub mod preprocessing;
pub mod primary;
pub mod region;

use crate::error::Result;
use crate::models::{BoundingBox, LocatedCandidate};
use crate::pipeline::PipelineContext;
use image::RgbImage;

pub use circles::FallbackCircleDetector;
pub use holder::HolderLocalizer;
pub use hybrid::{HybridSelector, Selection};
pub use primary::{ExternalDetector, LearnedDetector, PrimaryDetector, RawDetection};

/// A source of located candidates.
///
/// Both the learned-detector adapter and the geometric fallback implement
/// this, so the hybrid selector can swap either for a test double.
pub trait CandidateDetector: Send + Sync {
    /// Candidates inside `holder` (all candidates when there is none), in
    /// the order the detector produced them
    fn detect(
        &self,
        image: &RgbImage,
        holder: Option<&BoundingBox>,
        context: &PipelineContext,
    ) -> Result<Vec<LocatedCandidate>>;

    /// Human-readable name for this detector (used in log output)
    fn name(&self) -> &str;
}
