use crate::aggregate::aggregate;
use crate::annotate::annotate;
use crate::color::ColorClassifier;
use crate::config::PipelineConfig;
use crate::detection::{
    CandidateDetector, FallbackCircleDetector, HolderLocalizer, HybridSelector, LearnedDetector,
    PrimaryDetector, preprocessing,
};
use crate::error::{Error, Result};
use crate::models::{Candidate, DetectionResult};
use image::{DynamicImage, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Directory the intermediate images are written to
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Per-run options available to every stage
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub verbose: bool,
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every candidate at info level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(Error::DebugOutput {
                    path: output_dir,
                    message: "directory is not empty".to_string(),
                });
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.as_ref().is_some_and(|d| d.enabled)
    }

    /// Write `<name>.png` into the debug directory; a no-op outside debug mode
    pub fn save_debug(&self, name: &str, image: &DynamicImage) -> Result<()> {
        let Some(debug_config) = self.debug.as_ref().filter(|d| d.enabled) else {
            return Ok(());
        };

        let path = debug_config.output_dir.join(format!("{name}.png"));
        image.save(&path).map_err(|e| Error::DebugOutput {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "saved debug image");
        Ok(())
    }
}

/// Counts and color-classifies rolls in one image at a time.
///
/// Holds only read-only state, so one pipeline can be shared across
/// threads and called concurrently.
pub struct Pipeline {
    config: PipelineConfig,
    holder: HolderLocalizer,
    selector: HybridSelector,
    classifier: ColorClassifier,
    context: PipelineContext,
}

impl Pipeline {
    /// Build a pipeline from a validated configuration.
    ///
    /// `primary` is the learned detector; it is required unless the mode is
    /// `fallback_only`.
    pub fn new(config: PipelineConfig, primary: Option<Box<dyn PrimaryDetector>>) -> Result<Self> {
        config.validate()?;

        let primary = primary.map(|detector| {
            Box::new(LearnedDetector::new(detector, config.hybrid.primary_confidence))
                as Box<dyn CandidateDetector>
        });
        let fallback = Box::new(FallbackCircleDetector::new(&config.circles));
        let selector = HybridSelector::new(primary, fallback, &config.hybrid)?;

        Ok(Self {
            holder: HolderLocalizer::new(&config.holder),
            classifier: ColorClassifier::new(&config.color),
            selector,
            config,
            context: PipelineContext::new(),
        })
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.context = self.context.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn classifier(&self) -> &ColorClassifier {
        &self.classifier
    }

    /// Run on an image with the pipeline's own context
    pub fn process(&self, image: &RgbImage) -> Result<DetectionResult> {
        self.process_with_context(image, &self.context)
    }

    /// Decode a file and run on it
    pub fn process_path(&self, path: &Path) -> Result<DetectionResult> {
        let image = load_image(path)?;
        self.process(&image)
    }

    /// Decode an encoded image (PNG, JPEG, ...) and run on it
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<DetectionResult> {
        let image = decode_bytes(bytes)?;
        self.process(&image)
    }

    /// Run on an image with a caller-supplied context.
    ///
    /// Batch callers share one pipeline and give each image its own debug
    /// directory this way.
    pub fn process_with_context(
        &self,
        image: &RgbImage,
        context: &PipelineContext,
    ) -> Result<DetectionResult> {
        let (width, height) = image.dimensions();
        debug!(width, height, mode = ?self.selector.mode(), "processing image");

        let gray = preprocessing::to_grayscale(image);
        if context.debug_enabled() {
            context.save_debug("00_input", &DynamicImage::ImageRgb8(image.clone()))?;
            context.save_debug("01_grayscale", &DynamicImage::ImageLuma8(gray.clone()))?;
        }

        let holder = if self.holder.is_enabled() {
            let edges = self.holder.edge_map(&gray);
            let holder = self.holder.locate_in_edges(&edges);
            context.save_debug("03_holder_edges", &DynamicImage::ImageLuma8(edges))?;
            holder
        } else {
            None
        };
        if holder.is_none() {
            debug!("no holder found, counting over the whole image");
        }

        let selection = self.selector.select(image, holder.as_ref(), context)?;

        let candidates: Vec<Candidate> = selection
            .candidates
            .into_iter()
            .enumerate()
            .map(|(idx, located)| {
                let color = self.classifier.classify_region(image, &located.sample);
                if color.is_other() {
                    debug!(id = idx + 1, bbox = ?located.bbox, "no color rule matched");
                }
                Candidate {
                    id: idx as u32 + 1,
                    bbox: located.bbox,
                    confidence: located.confidence,
                    color,
                    center: located.center,
                    source_class: located.source_class,
                }
            })
            .collect();

        if context.verbose {
            for candidate in &candidates {
                info!(
                    id = candidate.id,
                    color = %candidate.color,
                    confidence = candidate.confidence,
                    bbox = ?candidate.bbox,
                    "candidate"
                );
            }
        }

        let result = aggregate(candidates).with_provenance(selection.source, holder);

        if context.debug_enabled() {
            context.save_debug("04_annotated", &DynamicImage::ImageRgb8(annotate(image, &result)))?;
        }

        info!(
            total = result.total_count(),
            source = %selection.source,
            holder = result.holder().is_some(),
            "counted rolls"
        );
        Ok(result)
    }
}

/// Open and decode an image file as RGB
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| Error::image_decode(format!("cannot open {}", path.display()), e))?
        .with_guessed_format()
        .map_err(|e| Error::image_decode(format!("cannot read {}", path.display()), e))?;
    let image = reader
        .decode()
        .map_err(|e| Error::image_decode(format!("cannot decode {}", path.display()), e))?;
    Ok(image.to_rgb8())
}

/// Decode an in-memory encoded image as RGB
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::image_decode("cannot read image bytes", e))?;
    let image = reader
        .decode()
        .map_err(|e| Error::image_decode("cannot decode image bytes", e))?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_dir_must_be_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("stale.png"), b"x").unwrap();

        let err = PipelineContext::new().with_debug(dir.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, Error::DebugOutput { .. }));
    }

    #[test]
    fn save_debug_is_noop_without_debug_dir() {
        let context = PipelineContext::new();
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(context.save_debug("00_input", &image).is_ok());
        assert!(!context.debug_enabled());
    }
}
