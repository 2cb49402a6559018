use log::trace;
use thiserror::Error;

use crate::features::image::RawImage;

/// Recoverable failure of the region-of-interest step.  The dataset
/// assembler skips the sample instead of aborting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CropError {
    #[error("no contour found down to edge threshold {0:.3}")]
    NoContour(f64),
    #[error("cannot crop an image with {0} channels")]
    UnsupportedChannels(usize),
    #[error("cannot crop an empty image")]
    Empty,
}

/// Isolates the region of interest of an image.
pub trait Crop: Send + Sync {
    fn crop(&self, image: &RawImage) -> Result<RawImage, CropError>;
}

/// Passes images through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCrop;

impl Crop for NoCrop {
    fn crop(&self, image: &RawImage) -> Result<RawImage, CropError> {
        Ok(image.clone())
    }
}

/// Finds the sign as the convex hull of its largest edge contour and blanks
/// everything outside it to transparent black.
///
/// Edges are gradient-magnitude pixels above a high threshold, plus pixels
/// above a low threshold that touch one.  When nothing qualifies both
/// thresholds are divided by `shrink` and the search repeats, until either
/// threshold falls below 1.
#[derive(Debug, Clone, Copy)]
pub struct SignCropper {
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub shrink: f64,
}

impl Default for SignCropper {
    fn default() -> Self {
        SignCropper { low_threshold: 100.0, high_threshold: 200.0, shrink: 1.5 }
    }
}

type Point = (i64, i64);

impl Crop for SignCropper {
    fn crop(&self, image: &RawImage) -> Result<RawImage, CropError> {
        if image.is_empty() {
            return Err(CropError::Empty);
        }
        if image.channels < 3 || image.data.len() < image.rows * image.cols * image.channels {
            return Err(CropError::UnsupportedChannels(image.channels));
        }

        let magnitude = gradient_magnitude(&grayscale(image), image.rows, image.cols);
        let edges = self.find_edges(&magnitude, image.rows, image.cols)?;

        let hull = largest_contour_hull(edges, image.rows, image.cols);
        if hull.len() < 3 {
            // A line or a point encloses nothing; keep the image whole.
            trace!("degenerate hull with {} points, image left uncropped", hull.len());
            return Ok(image.clone());
        }

        let mut cropped = image.clone();
        for row in 0..image.rows {
            for col in 0..image.cols {
                if !inside_convex(&hull, (col as i64, row as i64)) {
                    let start = (row * image.cols + col) * image.channels;
                    cropped.data[start..start + image.channels].fill(0.0);
                }
            }
        }
        Ok(cropped)
    }
}

impl SignCropper {
    fn find_edges(&self, magnitude: &[f64], rows: usize, cols: usize) -> Result<Vec<Point>, CropError> {
        let (mut low, mut high) = (self.low_threshold, self.high_threshold);
        loop {
            if low < 1.0 || high < 1.0 {
                return Err(CropError::NoContour(low.min(high)));
            }
            let edges = hysteresis(magnitude, rows, cols, low, high);
            if !edges.is_empty() {
                trace!("found {} edge pixels at thresholds {low:.2}/{high:.2}", edges.len());
                return Ok(edges);
            }
            low /= self.shrink;
            high /= self.shrink;
        }
    }
}

fn grayscale(image: &RawImage) -> Vec<f64> {
    image.data
        .chunks(image.channels)
        .take(image.rows * image.cols)
        .map(|p| 0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2])
        .collect()
}

/// L1 Sobel magnitude |gx| + |gy|, replicating the border.
fn gradient_magnitude(gray: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let at = |r: i64, c: i64| {
        let r = r.clamp(0, rows as i64 - 1) as usize;
        let c = c.clamp(0, cols as i64 - 1) as usize;
        gray[r * cols + c]
    };
    let mut out = Vec::with_capacity(rows * cols);
    for r in 0..rows as i64 {
        for c in 0..cols as i64 {
            let gx = (at(r - 1, c + 1) + 2.0 * at(r, c + 1) + at(r + 1, c + 1))
                - (at(r - 1, c - 1) + 2.0 * at(r, c - 1) + at(r + 1, c - 1));
            let gy = (at(r + 1, c - 1) + 2.0 * at(r + 1, c) + at(r + 1, c + 1))
                - (at(r - 1, c - 1) + 2.0 * at(r - 1, c) + at(r - 1, c + 1));
            out.push(gx.abs() + gy.abs());
        }
    }
    out
}

/// Strong pixels plus weak pixels adjacent to a strong one, as (x, y).
fn hysteresis(magnitude: &[f64], rows: usize, cols: usize, low: f64, high: f64) -> Vec<Point> {
    let strong = |r: i64, c: i64| {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols
            && magnitude[r as usize * cols + c as usize] >= high
    };
    let mut edges = Vec::new();
    for r in 0..rows as i64 {
        for c in 0..cols as i64 {
            let m = magnitude[r as usize * cols + c as usize];
            let keep = m >= high
                || (m >= low && (-1..=1).any(|dr| (-1..=1).any(|dc| strong(r + dr, c + dc))));
            if keep {
                edges.push((c, r));
            }
        }
    }
    edges
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Monotone chain; counter-clockwise, without collinear points.
fn convex_hull(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_unstable();
    points.dedup();
    if points.len() < 3 {
        return points;
    }
    let mut lower: Vec<Point> = Vec::with_capacity(points.len());
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }
    // each chain ends where the other starts
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Twice the enclosed area of a counter-clockwise polygon.
fn doubled_area(hull: &[Point]) -> i64 {
    hull.iter()
        .zip(hull.iter().cycle().skip(1))
        .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
        .sum()
}

/// Splits edge pixels into 8-connected contours and returns the hull
/// enclosing the most area.  Ties go to the contour with more pixels.
fn largest_contour_hull(edges: Vec<Point>, rows: usize, cols: usize) -> Vec<Point> {
    let mut unvisited = vec![false; rows * cols];
    for &(x, y) in &edges {
        unvisited[y as usize * cols + x as usize] = true;
    }

    let mut best: Option<(i64, usize, Vec<Point>)> = None;
    for &start in &edges {
        if !unvisited[start.1 as usize * cols + start.0 as usize] {
            continue;
        }
        unvisited[start.1 as usize * cols + start.0 as usize] = false;
        let mut contour = vec![start];
        let mut stack = vec![start];
        while let Some((x, y)) = stack.pop() {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx as usize >= cols || ny as usize >= rows {
                        continue;
                    }
                    let idx = ny as usize * cols + nx as usize;
                    if unvisited[idx] {
                        unvisited[idx] = false;
                        contour.push((nx, ny));
                        stack.push((nx, ny));
                    }
                }
            }
        }
        let pixels = contour.len();
        let hull = convex_hull(contour);
        let area = if hull.len() >= 3 { doubled_area(&hull) } else { 0 };
        let better = best.as_ref().map_or(true, |(a, n, _)| (area, pixels) > (*a, *n));
        if better {
            best = Some((area, pixels, hull));
        }
    }
    trace!("largest contour hull has {} points", best.as_ref().map_or(0, |b| b.2.len()));
    best.map(|(_, _, hull)| hull).unwrap_or_default()
}

/// Boundary counts as inside.
fn inside_convex(hull: &[Point], p: Point) -> bool {
    hull.iter()
        .zip(hull.iter().cycle().skip(1))
        .all(|(&a, &b)| cross(a, b, p) >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dark background with a bright filled square in the middle.
    fn square_sign(size: usize, from: usize, to: usize) -> RawImage {
        let mut data = Vec::with_capacity(size * size * 4);
        for r in 0..size {
            for c in 0..size {
                let on = (from..to).contains(&r) && (from..to).contains(&c);
                let v = if on { 250.0 } else { 5.0 };
                data.extend_from_slice(&[v, v, v, 255.0]);
            }
        }
        RawImage::new(size, size, 4, data)
    }

    #[test]
    fn uniform_image_has_no_contour() {
        let img = RawImage::new(6, 6, 4, vec![128.0; 6 * 6 * 4]);
        assert!(matches!(SignCropper::default().crop(&img), Err(CropError::NoContour(_))));
    }

    #[test]
    fn background_outside_the_sign_becomes_transparent() {
        let img = square_sign(12, 4, 8);
        let cropped = SignCropper::default().crop(&img).unwrap();
        // corner is far outside the edge hull
        assert_eq!(cropped.pixel(0, 0), Some(&[0.0, 0.0, 0.0, 0.0][..]));
        // centre of the square is untouched
        assert_eq!(cropped.pixel(6, 6), img.pixel(6, 6));
    }

    #[test]
    fn empty_and_grey_images_are_rejected() {
        assert_eq!(SignCropper::default().crop(&RawImage::new(0, 0, 4, vec![])), Err(CropError::Empty));
        let grey = RawImage::new(2, 2, 1, vec![0.0; 4]);
        assert_eq!(SignCropper::default().crop(&grey), Err(CropError::UnsupportedChannels(1)));
    }

    #[test]
    fn stray_speck_does_not_widen_the_sign_hull() {
        let mut img = square_sign(20, 8, 14);
        let speck = (20 + 1) * 4; // pixel (1, 1)
        img.data[speck..speck + 3].fill(250.0);
        let cropped = SignCropper::default().crop(&img).unwrap();
        assert_eq!(cropped.pixel(4, 4), Some(&[0.0, 0.0, 0.0, 0.0][..]));
        assert_eq!(cropped.pixel(10, 10), img.pixel(10, 10));
    }

    #[test]
    fn hull_keeps_corners_that_share_an_x() {
        let hull = convex_hull(vec![(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert_eq!(hull.len(), 4);
        assert!(inside_convex(&hull, (9, 9)));
        assert!(inside_convex(&hull, (10, 10)));
        assert!(!inside_convex(&hull, (11, 5)));
    }

    #[test]
    fn largest_contour_wins() {
        let mut edges: Vec<Point> = vec![(0, 0), (1, 0), (0, 1)];
        for i in 5..=9 {
            edges.extend([(i, 5), (i, 9), (5, i), (9, i)]);
        }
        let hull = largest_contour_hull(edges, 10, 10);
        assert!(hull.iter().all(|&(x, y)| x >= 5 && y >= 5));
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn hull_of_square_has_four_corners() {
        let pts = vec![(0, 0), (2, 0), (2, 2), (0, 2), (1, 1), (1, 0)];
        let hull = convex_hull(pts);
        assert_eq!(hull.len(), 4);
        assert!(inside_convex(&hull, (1, 1)));
        assert!(inside_convex(&hull, (2, 1)));
        assert!(!inside_convex(&hull, (3, 1)));
    }
}
