use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::{close, dilate, open};

/// Convert image to grayscale with BT.601 weights (0.299, 0.587, 0.114).
///
/// Fixed point with 14 fractional bits, rounded, so the dark-hole cutoff and
/// Canny thresholds keep their calibrated meaning.
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const HALF: u32 = 1 << 13;

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let luma = (u32::from(r) * R + u32::from(g) * G + u32::from(b) * B + HALF) >> 14;
        Luma([luma as u8])
    })
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Inverse binary threshold: pixels at or below `cutoff` become 255
pub fn threshold_inverse(img: &GrayImage, cutoff: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > cutoff {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Closing then opening with a square element of side `2 * radius + 1`
pub fn clean_mask(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let closed = close(mask, Norm::LInf, radius);
    open(&closed, Norm::LInf, radius)
}

/// Thicken edges so that loops broken by a pixel become closed
pub fn dilate_edges(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    dilate(edges, Norm::LInf, radius)
}

/// Fraction of non-zero pixels in a binary mask
pub fn foreground_fraction(mask: &GrayImage) -> f32 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let set = mask.pixels().filter(|p| p[0] > 0).count();
    set as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_grayscale_uses_bt601_weights() {
        let mut img = RgbImage::new(5, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));
        img.put_pixel(3, 0, Rgb([255, 255, 255]));
        img.put_pixel(4, 0, Rgb([100, 60, 30]));

        let gray = to_grayscale(&img);
        let values: Vec<u8> = gray.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![76, 150, 29, 255, 69]);
    }

    #[test]
    fn test_threshold_inverse_keeps_cutoff_dark() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[59u8, 60, 61][x as usize]]));
        let mask = threshold_inverse(&gray, 60);
        let values: Vec<u8> = mask.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![255, 255, 0]);
    }
}
