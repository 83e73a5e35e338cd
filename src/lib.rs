//! Count thread rolls in a holder image and classify their colors.
//!
//! A [`Pipeline`] locates the holder, takes candidates from a learned
//! detector or, when that detector finds too few, from a circular-hole
//! fallback, labels each candidate's dominant color with an ordered HSV
//! rule table and tallies the result.

pub mod aggregate;
pub mod annotate;
pub mod color;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use aggregate::aggregate;
pub use color::{ColorClassifier, ColorRule, ColorRuleTable, Hsv};
pub use config::{DetectionMode, PipelineConfig};
pub use detection::{ExternalDetector, PrimaryDetector, RawDetection};
pub use error::{Error, Result};
pub use models::{BoundingBox, Candidate, ColorLabel, DetectionResult, DetectionSource};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext};
