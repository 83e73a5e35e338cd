//! Render detections over the input image for debug output.

use crate::models::{BoundingBox, ColorLabel, DetectionResult};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

const HOLDER_COLOR: Rgb<u8> = Rgb([0, 200, 0]);

/// Outline color for a label; unknown labels are drawn gray
pub fn label_color(label: &ColorLabel) -> Rgb<u8> {
    match label.as_str() {
        "pink" => Rgb([0xff, 0x69, 0xb4]),
        "yellow" => Rgb([0xff, 0xd7, 0x00]),
        "orange" => Rgb([0xff, 0x8c, 0x00]),
        "orange_brown" => Rgb([0xd2, 0x69, 0x1e]),
        "white" => Rgb([0x00, 0x00, 0x00]),
        _ => Rgb([0x80, 0x80, 0x80]),
    }
}

/// Copy of `image` with the holder, every detection box and hole centers drawn on it
pub fn annotate(image: &RgbImage, result: &DetectionResult) -> RgbImage {
    let mut canvas = image.clone();

    if let Some(holder) = result.holder() {
        outline(&mut canvas, holder, HOLDER_COLOR, 2);
    }

    for candidate in result.detections() {
        let color = label_color(&candidate.color);
        outline(&mut canvas, &candidate.bbox, color, 1);
        if let Some((x, y)) = candidate.center {
            draw_cross_mut(&mut canvas, color, x as i32, y as i32);
        }
    }

    canvas
}

fn outline(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    for inset in 0..thickness {
        let x = bbox.x1.round() as i32 + inset as i32;
        let y = bbox.y1.round() as i32 + inset as i32;
        let w = (bbox.width().round() as i64 - 2 * inset as i64).max(1) as u32;
        let h = (bbox.height().round() as i64 - 2 * inset as i64).max(1) as u32;
        draw_hollow_rect_mut(canvas, Rect::at(x, y).of_size(w, h), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::models::Candidate;

    #[test]
    fn draws_box_in_label_color() {
        let image = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let result = aggregate(vec![Candidate {
            id: 1,
            bbox: BoundingBox::new(10.0, 10.0, 30.0, 30.0).unwrap(),
            confidence: 0.95,
            color: ColorLabel::pink(),
            center: Some((20, 20)),
            source_class: "thread_roll".to_string(),
        }]);

        let annotated = annotate(&image, &result);

        assert_eq!(*annotated.get_pixel(10, 10), label_color(&ColorLabel::pink()));
        assert_eq!(*annotated.get_pixel(20, 20), label_color(&ColorLabel::pink()));
        assert_eq!(*annotated.get_pixel(40, 40), Rgb([255, 255, 255]));
    }
}
