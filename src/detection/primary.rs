//! The learned detector capability and its adapters.
//!
//! How the detector works is not this crate's business: anything that
//! returns boxes with confidences and class names for an image can serve.
//! [`ExternalDetector`] runs a separate inference program;
//! [`LearnedDetector`] turns raw boxes into located candidates.

use super::{CandidateDetector, region};
use crate::error::{Error, Result};
use crate::models::{BoundingBox, LocatedCandidate, SampleRegion};
use crate::pipeline::PipelineContext;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// One box reported by a learned detector, `bbox` as `[x1, y1, x2, y2]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub confidence: f32,
    #[serde(rename = "class")]
    pub class_label: String,
}

/// Contract of the learned object detector.
///
/// Finding nothing is reported as an empty list, never as an error.
/// Implementations must be callable from several threads at once.
pub trait PrimaryDetector: Send + Sync {
    fn detect(&self, image: &RgbImage, confidence_threshold: f32) -> Result<Vec<RawDetection>>;
}

/// Adapts a [`PrimaryDetector`] to the candidate interface
pub struct LearnedDetector {
    inner: Box<dyn PrimaryDetector>,
    confidence_threshold: f32,
}

impl LearnedDetector {
    pub fn new(inner: Box<dyn PrimaryDetector>, confidence_threshold: f32) -> Self {
        Self {
            inner,
            confidence_threshold,
        }
    }
}

impl CandidateDetector for LearnedDetector {
    fn detect(
        &self,
        image: &RgbImage,
        holder: Option<&BoundingBox>,
        _context: &PipelineContext,
    ) -> Result<Vec<LocatedCandidate>> {
        let (width, height) = image.dimensions();
        let raw = self.inner.detect(image, self.confidence_threshold)?;
        debug!(detections = raw.len(), "primary detector returned");

        let mut located = Vec::with_capacity(raw.len());
        for det in raw {
            let [x1, y1, x2, y2] = det.bbox;
            let clipped = BoundingBox::new(x1, y1, x2, y2).and_then(|b| b.clip(width, height));
            let Some(bbox) = clipped else {
                warn!(bbox = ?det.bbox, class = %det.class_label, "dropping degenerate detection");
                continue;
            };

            located.push(LocatedCandidate {
                bbox,
                confidence: det.confidence.clamp(0.0, 1.0),
                center: None,
                source_class: det.class_label,
                sample: SampleRegion::Crop(bbox),
            });
        }

        Ok(region::retain_inside(located, holder))
    }

    fn name(&self) -> &str {
        "Learned Detection"
    }
}

/// Runs an external inference program as the learned detector.
///
/// The program is invoked as
/// `program [args..] [--weights <file>] <image.png> <confidence>` and must
/// print a JSON array of [`RawDetection`] objects on stdout.
#[derive(Debug, Clone)]
pub struct ExternalDetector {
    program: PathBuf,
    weights: Option<PathBuf>,
    args: Vec<String>,
}

impl ExternalDetector {
    /// Fails with [`Error::ModelUnavailable`] when the program or the
    /// weights file cannot be found
    pub fn new(
        program: impl AsRef<Path>,
        weights: Option<PathBuf>,
        args: Vec<String>,
    ) -> Result<Self> {
        let program = resolve_program(program.as_ref()).ok_or_else(|| Error::ModelUnavailable {
            path: program.as_ref().to_path_buf(),
            reason: "detector program not found".to_string(),
        })?;

        if let Some(weights) = &weights {
            if !weights.is_file() {
                return Err(Error::ModelUnavailable {
                    path: weights.clone(),
                    reason: "model weights not found".to_string(),
                });
            }
        }

        Ok(Self {
            program,
            weights,
            args,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl PrimaryDetector for ExternalDetector {
    fn detect(&self, image: &RgbImage, confidence_threshold: f32) -> Result<Vec<RawDetection>> {
        let input = tempfile::Builder::new()
            .prefix("rollcount-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), image::ImageFormat::Png)
            .map_err(|e| Error::primary_with("failed to write detector input", e))?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(weights) = &self.weights {
            command.arg("--weights").arg(weights);
        }
        command.arg(input.path()).arg(confidence_threshold.to_string());

        let output = command.output().map_err(|e| {
            Error::primary_with(format!("failed to run {}", self.program.display()), e)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::primary(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(stdout.trim())
            .map_err(|e| Error::primary_with("malformed detector output", e))
    }
}

/// Locate an executable: explicit paths must exist, bare names are looked up on `PATH`
fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
