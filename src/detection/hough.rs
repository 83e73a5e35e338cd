//! Circular Hough search, gradient method.
//!
//! Every Canny edge pixel votes along its gradient direction, both ways,
//! at distances in `[min_radius, max_radius]`. Hole centers collect votes
//! from the whole rim. Votes are pooled over a 3x3 cell window before
//! thresholding so a peak split across neighbouring cells still counts.
//! Accepted centers are taken in order of decreasing support, skipping any
//! closer than `min_dist` to an accepted one, and the radius is the
//! distance band holding the densest run of edge pixels. A center is only
//! kept when edge pixels at that radius surround it; the crossing vote
//! bands of a rectangle corner reach the threshold but cover only two
//! narrow arcs.

use image::GrayImage;
use std::f32::consts::{PI, TAU};
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Inverse accumulator resolution (1.0 = one cell per pixel)
    pub dp: f32,
    /// Minimum distance between circle centers
    pub min_dist: f32,
    /// Canny high threshold; the low threshold is half
    pub canny_threshold: f32,
    /// Pooled votes a center must exceed
    pub accumulator_threshold: f32,
    pub min_radius: u32,
    pub max_radius: u32,
    /// Fraction of angular sectors that must contain rim pixels
    pub min_rim_coverage: f32,
}

/// Angular sectors used for the rim coverage test
const RIM_SECTORS: usize = 16;

/// A detected circle in pixel-index coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Pooled accumulator value at the center
    pub votes: u32,
}

struct EdgePoints {
    /// Sorted x coordinates of edge pixels, per row
    rows: Vec<Vec<u32>>,
}

impl EdgePoints {
    /// `(distance, angle)` from `(cx, cy)` of edge pixels within `[lo, hi]`
    fn rim(&self, cx: f32, cy: f32, lo: f32, hi: f32) -> Vec<(f32, f32)> {
        let mut out = Vec::new();
        let y_start = (cy - hi).floor().max(0.0) as usize;
        let y_end = ((cy + hi).ceil().max(0.0) as usize + 1).min(self.rows.len());
        let x_lo = (cx - hi).floor().max(0.0) as u32;
        let x_hi = (cx + hi).ceil().max(0.0) as u32;
        let (lo_sq, hi_sq) = (lo * lo, hi * hi);

        for y in y_start..y_end {
            let row = &self.rows[y];
            let first = row.partition_point(|&x| x < x_lo);
            let dy = y as f32 - cy;
            for &x in row[first..].iter().take_while(|&&x| x <= x_hi) {
                let dx = x as f32 - cx;
                let d_sq = dx * dx + dy * dy;
                if d_sq >= lo_sq && d_sq <= hi_sq {
                    out.push((d_sq.sqrt(), dy.atan2(dx)));
                }
            }
        }
        out
    }
}

/// Find circles in a grayscale image.
///
/// The result is ordered by decreasing accumulator support.
pub fn hough_circles(gray: &GrayImage, params: &HoughParams) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 || params.dp <= 0.0 || params.min_radius > params.max_radius {
        return Vec::new();
    }

    let edges = canny(gray, params.canny_threshold / 2.0, params.canny_threshold);
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);

    let idp = 1.0 / params.dp;
    let acc_w = (w as f32 * idp).ceil() as usize + 1;
    let acc_h = (h as f32 * idp).ceil() as usize + 1;
    let mut accum = vec![0u32; acc_w * acc_h];
    let mut rows: Vec<Vec<u32>> = vec![Vec::new(); h as usize];

    for (x, y, px) in edges.enumerate_pixels() {
        if px[0] == 0 {
            continue;
        }
        let gxv = gx.get_pixel(x, y)[0] as f32;
        let gyv = gy.get_pixel(x, y)[0] as f32;
        let mag = (gxv * gxv + gyv * gyv).sqrt();
        if mag < 1e-6 {
            continue;
        }
        rows[y as usize].push(x);

        let (ux, uy) = (gxv / mag, gyv / mag);
        // pixel centers sit at +0.5 in accumulator space
        let (ox, oy) = (x as f32 + 0.5, y as f32 + 0.5);

        for sign in [1.0f32, -1.0] {
            let mut last_cell = usize::MAX;
            for r in params.min_radius..=params.max_radius {
                let px = ox + sign * ux * r as f32;
                let py = oy + sign * uy * r as f32;
                if px < 0.0 || py < 0.0 {
                    break;
                }
                let ax = (px * idp) as usize;
                let ay = (py * idp) as usize;
                if ax >= acc_w || ay >= acc_h {
                    break;
                }
                let cell = ay * acc_w + ax;
                // consecutive radii can land in the same cell
                if cell != last_cell {
                    accum[cell] += 1;
                    last_cell = cell;
                }
            }
        }
    }

    let edge_points = EdgePoints { rows };
    let pooled = pool_3x3(&accum, acc_w, acc_h);
    let centers = local_maxima(&pooled, acc_w, acc_h, params.accumulator_threshold);

    let min_dist_sq = params.min_dist * params.min_dist;
    let mut circles: Vec<Circle> = Vec::new();

    for (cell, votes) in centers {
        let (cx, cy) = refine_center(&accum, acc_w, cell, params.dp);

        let crowded = circles.iter().any(|c| {
            let (dx, dy) = (c.x - cx, c.y - cy);
            dx * dx + dy * dy < min_dist_sq
        });
        if crowded {
            continue;
        }

        let rim = edge_points.rim(
            cx,
            cy,
            params.min_radius as f32,
            params.max_radius as f32,
        );
        let band = params.dp.max(1.0);
        let mut dists: Vec<f32> = rim.iter().map(|&(d, _)| d).collect();
        let Some(radius) = best_radius(&mut dists, band) else {
            continue;
        };
        if rim_coverage(&rim, radius, band) < params.min_rim_coverage {
            continue;
        }

        circles.push(Circle {
            x: cx,
            y: cy,
            radius,
            votes,
        });
    }

    circles
}

/// Fraction of angular sectors holding a rim pixel within `band` of `radius`
fn rim_coverage(rim: &[(f32, f32)], radius: f32, band: f32) -> f32 {
    let mut hit = [false; RIM_SECTORS];
    for &(dist, angle) in rim {
        if (dist - radius).abs() <= band {
            let sector = ((angle + PI) / TAU * RIM_SECTORS as f32) as usize;
            hit[sector.min(RIM_SECTORS - 1)] = true;
        }
    }
    hit.iter().filter(|&&h| h).count() as f32 / RIM_SECTORS as f32
}

/// Sum of each interior cell's 3x3 neighbourhood; the outer ring stays 0
fn pool_3x3(accum: &[u32], w: usize, h: usize) -> Vec<u32> {
    let mut pooled = vec![0u32; accum.len()];
    if w < 3 || h < 3 {
        return pooled;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut sum = 0;
            for ny in y - 1..=y + 1 {
                let base = ny * w;
                sum += accum[base + x - 1] + accum[base + x] + accum[base + x + 1];
            }
            pooled[y * w + x] = sum;
        }
    }
    pooled
}

/// Cells above the threshold that beat their 4-neighbours, strongest first.
///
/// Ties against the left/upper neighbour lose and against the right/lower
/// neighbour win, so a flat plateau yields one peak.
fn local_maxima(pooled: &[u32], w: usize, h: usize, threshold: f32) -> Vec<(usize, u32)> {
    let mut peaks = Vec::new();
    if w < 3 || h < 3 {
        return peaks;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = y * w + x;
            let v = pooled[idx];
            if (v as f32) <= threshold {
                continue;
            }
            if v > pooled[idx - 1]
                && v >= pooled[idx + 1]
                && v > pooled[idx - w]
                && v >= pooled[idx + w]
            {
                peaks.push((idx, v));
            }
        }
    }
    // stable: equal support keeps raster order
    peaks.sort_by(|a, b| b.1.cmp(&a.1));
    peaks
}

/// Vote-weighted centroid of the 3x3 window, in pixel-index coordinates
fn refine_center(accum: &[u32], w: usize, cell: usize, dp: f32) -> (f32, f32) {
    let (x, y) = (cell % w, cell / w);
    let (mut sx, mut sy, mut total) = (0.0f32, 0.0f32, 0.0f32);
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            let v = accum[ny * w + nx] as f32;
            sx += v * (nx as f32 + 0.5);
            sy += v * (ny as f32 + 0.5);
            total += v;
        }
    }
    let (ax, ay) = if total > 0.0 {
        (sx / total, sy / total)
    } else {
        (x as f32 + 0.5, y as f32 + 0.5)
    };
    (ax * dp - 0.5, ay * dp - 0.5)
}

/// Mean distance of the densest run of distances no wider than `band`.
///
/// Density is run length over radius, so larger circles need
/// proportionally more rim pixels to win.
fn best_radius(dists: &mut [f32], band: f32) -> Option<f32> {
    if dists.is_empty() {
        return None;
    }
    dists.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(f32, f32)> = None;
    let mut end = 0;
    let mut sum = 0.0f32;
    for start in 0..dists.len() {
        // the window always holds dists[start] itself
        while end < dists.len() && dists[end] - dists[start] <= band {
            sum += dists[end];
            end += 1;
        }
        let count = (end - start) as f32;
        let radius = sum / count;
        let score = count / radius.max(1.0);
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, radius));
        }
        sum -= dists[start];
    }

    best.map(|(_, radius)| radius)
}
