use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

/// Outer border of a connected edge region
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Contour {
    fn from_points(points: Vec<Point<i32>>) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            points,
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Bounding rectangle width, counting both end pixels
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x + 1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y + 1) as u32
    }

    /// Polygon area of the border (shoelace formula)
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice = 0i64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        (twice as f64 / 2.0).abs()
    }

    pub fn aspect_ratio(&self) -> f32 {
        let h = self.height() as f32;
        if h == 0.0 {
            return 0.0;
        }
        self.width() as f32 / h
    }
}

/// Find outermost contours in a binary edge image (nested borders are skipped)
pub fn find_external_contours(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| Contour::from_points(c.points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_filled_square_area_and_extent() {
        let mut img = GrayImage::new(50, 50);
        for y in 10..30 {
            for x in 5..35 {
                img.put_pixel(x, y, Luma([255]));
            }
        }

        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 1);

        let c = &contours[0];
        assert_eq!((c.min_x, c.min_y, c.max_x, c.max_y), (5, 10, 34, 29));
        assert_eq!(c.width(), 30);
        assert_eq!(c.height(), 20);
        // border polygon runs through pixel centers: 29 x 19
        assert!((c.area() - 551.0).abs() < 1e-6);
    }

    #[test]
    fn test_nested_contours_are_not_external() {
        let mut img = GrayImage::new(60, 60);
        for y in 5..55 {
            for x in 5..55 {
                let ring = x < 10 || x >= 50 || y < 10 || y >= 50;
                let inner = (20..40).contains(&x) && (20..40).contains(&y);
                if ring || inner {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }

        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].width(), 50);
    }
}
