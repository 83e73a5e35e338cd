mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from rollcount for tests
pub use rollcount::detection::{CandidateDetector, PrimaryDetector, RawDetection};
pub use rollcount::models::{LocatedCandidate, SampleRegion};
pub use rollcount::{
    BoundingBox, ColorLabel, DetectionMode, DetectionResult, DetectionSource, Error, Pipeline,
    PipelineConfig, PipelineContext,
};
