use super::CandidateDetector;
use crate::config::{DetectionMode, HybridConfig};
use crate::error::{Error, Result};
use crate::models::{BoundingBox, DetectionSource, LocatedCandidate};
use crate::pipeline::PipelineContext;
use image::RgbImage;
use tracing::{debug, info};

/// Candidates from exactly one detector
#[derive(Debug, Clone)]
pub struct Selection {
    pub source: DetectionSource,
    pub candidates: Vec<LocatedCandidate>,
}

/// Chooses between the learned detector and the circle fallback per image.
///
/// In hybrid mode the primary output is kept only when it holds more than
/// `coverage_threshold` candidates inside the holder; a thin result is
/// taken as a detector failure and replaced (not merged) by the fallback.
pub struct HybridSelector {
    primary: Option<Box<dyn CandidateDetector>>,
    fallback: Box<dyn CandidateDetector>,
    mode: DetectionMode,
    coverage_threshold: usize,
}

impl HybridSelector {
    /// Fails when the mode needs a primary detector and none is given
    pub fn new(
        primary: Option<Box<dyn CandidateDetector>>,
        fallback: Box<dyn CandidateDetector>,
        config: &HybridConfig,
    ) -> Result<Self> {
        if config.mode.requires_primary() && primary.is_none() {
            return Err(Error::PrimaryRequired {
                mode: format!("{:?}", config.mode),
            });
        }
        Ok(Self {
            primary,
            fallback,
            mode: config.mode,
            coverage_threshold: config.coverage_threshold,
        })
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn select(
        &self,
        image: &RgbImage,
        holder: Option<&BoundingBox>,
        context: &PipelineContext,
    ) -> Result<Selection> {
        let primary = match (&self.primary, self.mode) {
            (Some(primary), DetectionMode::Hybrid | DetectionMode::PrimaryOnly) => primary,
            _ => return self.run_fallback(image, holder, context),
        };

        let candidates = primary.detect(image, holder, context)?;

        if self.mode == DetectionMode::PrimaryOnly || candidates.len() > self.coverage_threshold {
            info!(
                detector = primary.name(),
                count = candidates.len(),
                "using primary detections"
            );
            return Ok(Selection {
                source: DetectionSource::Primary,
                candidates,
            });
        }

        info!(
            count = candidates.len(),
            threshold = self.coverage_threshold,
            "primary coverage too low, switching to fallback"
        );
        self.run_fallback(image, holder, context)
    }

    fn run_fallback(
        &self,
        image: &RgbImage,
        holder: Option<&BoundingBox>,
        context: &PipelineContext,
    ) -> Result<Selection> {
        let candidates = self.fallback.detect(image, holder, context)?;
        debug!(
            detector = self.fallback.name(),
            count = candidates.len(),
            "fallback detections"
        );
        Ok(Selection {
            source: DetectionSource::Fallback,
            candidates,
        })
    }
}
