mod common;
use common::*;

use rollcount::config::CircleConfig;
use rollcount::detection::FallbackCircleDetector;
use rollcount::detection::circles::roll_bbox;
use rollcount::detection::hough::Circle;

#[test]
fn test_roll_bbox_from_hole() -> anyhow::Result<()> {
    let bbox = roll_bbox(100, 100, 10, 7.0).ok_or_else(|| anyhow::anyhow!("empty box"))?;
    assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (30.0, 30.0, 170.0, 170.0));
    Ok(())
}

#[test]
fn test_located_candidate_is_clipped() -> anyhow::Result<()> {
    let detector = FallbackCircleDetector::new(&CircleConfig::default());
    let circle = Circle {
        x: 20.0,
        y: 190.4,
        radius: 10.0,
        votes: 40,
    };

    let located = detector
        .locate(&circle, 200, 200)
        .ok_or_else(|| anyhow::anyhow!("candidate clipped away"))?;

    assert_eq!(located.center, Some((20, 190)));
    assert_eq!(
        (located.bbox.x1, located.bbox.y1, located.bbox.x2, located.bbox.y2),
        (0.0, 120.0, 90.0, 200.0)
    );
    assert_eq!(located.confidence, 0.95);
    assert_eq!(located.source_class, "thread_roll");
    assert_eq!(
        located.sample,
        SampleRegion::Annulus {
            cx: 20.0,
            cy: 190.0,
            inner_radius: 15.0,
            outer_radius: 60.0,
        }
    );

    Ok(())
}

#[test]
fn test_single_hole_end_to_end() -> anyhow::Result<()> {
    let image = roll_image(400, 400, ORANGE_BROWN, &[(200, 200, 10)]);

    // the stub finds nothing, so the hybrid policy falls back to circles
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(StubPrimary::boxed(Vec::new())))?;
    let result = pipeline.process(&image)?;

    assert_eq!(result.total_count(), 1);
    assert_eq!(result.count_of(&ColorLabel::orange_brown()), 1);
    assert_eq!(result.color_counts().len(), 1);
    assert_eq!(result.source(), Some(DetectionSource::Fallback));
    assert!(result.holder().is_none());

    let roll = &result.detections()[0];
    assert_eq!(roll.id, 1);
    let (cx, cy) = roll.center.ok_or_else(|| anyhow::anyhow!("circle candidate without center"))?;
    assert!(cx.abs_diff(200) <= 2 && cy.abs_diff(200) <= 2);

    Ok(())
}

#[test]
fn test_fallback_only_needs_no_primary() -> anyhow::Result<()> {
    let image = roll_image(400, 400, ORANGE_BROWN, &[(200, 200, 10)]);
    let pipeline = Pipeline::new(config_with_mode(DetectionMode::FallbackOnly), None)?;

    let result = pipeline.process(&image)?;
    assert_eq!(result.total_count(), 1);

    Ok(())
}

#[test]
fn test_holes_outside_radius_band_are_ignored() -> anyhow::Result<()> {
    // radius 60 is far above the default band of 6..=22
    let image = roll_image(400, 400, ORANGE_BROWN, &[(200, 200, 60)]);
    let pipeline = Pipeline::new(config_with_mode(DetectionMode::FallbackOnly), None)?;

    let result = pipeline.process(&image)?;
    assert_eq!(result.total_count(), 0);
    assert!(result.color_counts().is_empty());

    Ok(())
}

#[test]
fn test_result_invariants_with_several_rolls() -> anyhow::Result<()> {
    let holes = [(60, 60, 10), (200, 60, 12), (340, 60, 9), (60, 300, 11), (340, 340, 10)];
    let image = roll_image(400, 400, ORANGE_BROWN, &holes);
    let pipeline = Pipeline::new(config_with_mode(DetectionMode::FallbackOnly), None)?;

    let result = pipeline.process(&image)?;

    assert_eq!(result.total_count(), holes.len());
    assert_eq!(result.total_count(), result.detections().len());
    assert_eq!(result.color_counts().values().sum::<usize>(), result.total_count());
    for (idx, roll) in result.detections().iter().enumerate() {
        assert_eq!(roll.id as usize, idx + 1);
        assert!(roll.bbox.x1 < roll.bbox.x2 && roll.bbox.y1 < roll.bbox.y2);
        assert!(roll.bbox.x1 >= 0.0 && roll.bbox.y1 >= 0.0);
        assert!(roll.bbox.x2 <= 400.0 && roll.bbox.y2 <= 400.0);
    }

    Ok(())
}
