mod common;
use common::*;

use image::RgbImage;
use rollcount::config::HybridConfig;
use rollcount::detection::HybridSelector;

fn selector(primary_count: usize, mode: DetectionMode) -> rollcount::Result<HybridSelector> {
    let config = HybridConfig {
        mode,
        ..HybridConfig::default()
    };
    HybridSelector::new(
        Some(Box::new(StubDetector {
            count: primary_count,
            class: "primary",
        })),
        Box::new(StubDetector {
            count: 3,
            class: "fallback",
        }),
        &config,
    )
}

#[test]
fn test_high_coverage_keeps_primary() -> anyhow::Result<()> {
    let image = RgbImage::new(400, 400);
    let selection =
        selector(60, DetectionMode::Hybrid)?.select(&image, None, &PipelineContext::new())?;

    assert_eq!(selection.source, DetectionSource::Primary);
    assert_eq!(selection.candidates.len(), 60);
    assert!(selection.candidates.iter().all(|c| c.source_class == "primary"));

    Ok(())
}

#[test]
fn test_low_coverage_switches_to_fallback() -> anyhow::Result<()> {
    let image = RgbImage::new(400, 400);
    let selection =
        selector(10, DetectionMode::Hybrid)?.select(&image, None, &PipelineContext::new())?;

    assert_eq!(selection.source, DetectionSource::Fallback);
    // replaced, never merged
    assert_eq!(selection.candidates.len(), 3);
    assert!(selection.candidates.iter().all(|c| c.source_class == "fallback"));

    Ok(())
}

#[test]
fn test_threshold_is_strict() -> anyhow::Result<()> {
    let image = RgbImage::new(400, 400);
    let context = PipelineContext::new();

    let at = selector(50, DetectionMode::Hybrid)?.select(&image, None, &context)?;
    assert_eq!(at.source, DetectionSource::Fallback);

    let above = selector(51, DetectionMode::Hybrid)?.select(&image, None, &context)?;
    assert_eq!(above.source, DetectionSource::Primary);

    Ok(())
}

#[test]
fn test_coverage_counted_after_holder_filtering() -> anyhow::Result<()> {
    let image = RgbImage::new(400, 400);
    // keeps the first three grid rows (30 candidates) out of 60
    let holder = BoundingBox::new(0.0, 0.0, 400.0, 90.0).ok_or_else(|| anyhow::anyhow!("bad box"))?;

    let selection = selector(60, DetectionMode::Hybrid)?.select(
        &image,
        Some(&holder),
        &PipelineContext::new(),
    )?;
    assert_eq!(selection.source, DetectionSource::Fallback);

    Ok(())
}

#[test]
fn test_modes() -> anyhow::Result<()> {
    let image = RgbImage::new(400, 400);
    let context = PipelineContext::new();

    let primary_only = selector(10, DetectionMode::PrimaryOnly)?.select(&image, None, &context)?;
    assert_eq!(primary_only.source, DetectionSource::Primary);
    assert_eq!(primary_only.candidates.len(), 10);

    let fallback_only = selector(60, DetectionMode::FallbackOnly)?.select(&image, None, &context)?;
    assert_eq!(fallback_only.source, DetectionSource::Fallback);
    assert_eq!(fallback_only.candidates.len(), 3);

    Ok(())
}

#[test]
fn test_hybrid_requires_primary() -> anyhow::Result<()> {
    let result = HybridSelector::new(
        None,
        Box::new(StubDetector {
            count: 3,
            class: "fallback",
        }),
        &HybridConfig::default(),
    );
    assert!(matches!(result, Err(Error::PrimaryRequired { .. })));

    let pipeline = Pipeline::new(PipelineConfig::default(), None);
    assert!(matches!(pipeline, Err(Error::PrimaryRequired { .. })));

    Ok(())
}

#[test]
fn test_pipeline_reports_primary_source() -> anyhow::Result<()> {
    // blank image: the circle fallback finds nothing, so any count comes from the stub
    let image = RgbImage::from_pixel(400, 400, ORANGE_BROWN);

    let primary = StubPrimary::boxed(grid_detections(60));
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(primary))?;
    let result = pipeline.process(&image)?;
    assert_eq!(result.source(), Some(DetectionSource::Primary));
    assert_eq!(result.total_count(), 60);
    assert_eq!(result.count_of(&ColorLabel::orange_brown()), 60);

    let primary = StubPrimary::boxed(grid_detections(10));
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(primary))?;
    let result = pipeline.process(&image)?;
    assert_eq!(result.source(), Some(DetectionSource::Fallback));
    assert_eq!(result.total_count(), 0);
    assert!(result.color_counts().is_empty());

    Ok(())
}

#[test]
fn test_primary_boxes_are_clipped() -> anyhow::Result<()> {
    let image = RgbImage::from_pixel(100, 100, ORANGE_BROWN);
    let detections = vec![
        RawDetection {
            bbox: [-10.0, -10.0, 20.0, 20.0],
            confidence: 1.4,
            class_label: "thread_roll".to_string(),
        },
        // entirely outside the image
        RawDetection {
            bbox: [150.0, 150.0, 170.0, 170.0],
            confidence: 0.9,
            class_label: "thread_roll".to_string(),
        },
    ];

    let pipeline = Pipeline::new(
        config_with_mode(DetectionMode::PrimaryOnly),
        Some(StubPrimary::boxed(detections)),
    )?;
    let result = pipeline.process(&image)?;

    assert_eq!(result.total_count(), 1);
    let kept = &result.detections()[0];
    assert_eq!((kept.bbox.x1, kept.bbox.y1, kept.bbox.x2, kept.bbox.y2), (0.0, 0.0, 20.0, 20.0));
    assert_eq!(kept.confidence, 1.0);
    assert_eq!(kept.id, 1);

    Ok(())
}
