//! RGB to HSV conversion on the 8-bit scale.
//!
//! Hue is halved to fit a byte (0..=180), saturation and value span
//! 0..=255. This is the scale the rule table bands are written in.

use serde::{Deserialize, Serialize};

/// HSV triple, H in 0..=180, S and V in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Convert an 8-bit RGB color.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb.map(f32::from);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: (h / 2.0).round().min(180.0) as u8,
        s: s.round().min(255.0) as u8,
        v: v.round() as u8,
    }
}

/// Round a floating-point centroid to the nearest 8-bit color.
pub fn quantize(rgb: [f64; 3]) -> [u8; 3] {
    rgb.map(|c| c.round().clamp(0.0, 255.0) as u8)
}
