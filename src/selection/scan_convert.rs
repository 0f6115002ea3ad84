//! Scan conversion of closed outlines into coverage masks.
//!
//! Outlines are walked edge by edge, recording where each edge crosses the
//! scanline rows. Each row's sorted crossings are then paired up left to
//! right and the spans between pairs are filled (even-odd rule). With
//! antialiasing the same walk runs on a grid `supersample` times finer in
//! both axes and each output pixel averages its `supersample²` sub-pixels.

use std::f64::consts::TAU;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::mask::SelectionMask;
use crate::error::{try_alloc, Result};

/// Default linear supersampling factor for antialiased rendering.
pub const SUPERSAMPLE: u32 = 3;

/// Accumulates closed outlines and renders them into one mask.
#[derive(Debug, Clone, Default)]
pub struct ScanConverter {
    outlines: Vec<Vec<(f64, f64)>>,
}

impl ScanConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outline_count(&self) -> usize {
        self.outlines.len()
    }

    /// Add a closed polygon. The closing edge back to the first point is
    /// implied.
    pub fn add_polygon<P: Into<(f64, f64)> + Copy>(&mut self, points: &[P]) -> &mut Self {
        let outline: Vec<(f64, f64)> = points.iter().map(|&p| p.into()).collect();
        if outline.len() >= 2 {
            self.outlines.push(outline);
        }
        self
    }

    pub fn add_rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.add_polygon(&[(x, y), (x + width, y), (x + width, y + height), (x, y + height)])
    }

    /// Add an axis aligned ellipse, approximated by a polygon fine enough
    /// that no edge is longer than about two pixels.
    pub fn add_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> &mut Self {
        let rx = rx.abs();
        let ry = ry.abs();
        let perimeter = TAU * ((rx * rx + ry * ry) / 2.0).sqrt();
        let steps = ((perimeter / 2.0).ceil() as usize).clamp(16, 4096);

        let outline: Vec<(f64, f64)> = (0..steps)
            .map(|i| {
                let t = TAU * i as f64 / steps as f64;
                (cx + rx * t.cos(), cy + ry * t.sin())
            })
            .collect();
        self.add_polygon(&outline)
    }

    /// Add a closed chain of cubic bezier segments.
    ///
    /// `points` holds `anchor, control, control` triples; the last triple's
    /// segment ends at the first anchor. Chains whose length is not a
    /// multiple of three are ignored.
    pub fn add_bezier(&mut self, points: &[(f64, f64)]) -> &mut Self {
        if points.len() < 3 || points.len() % 3 != 0 {
            warn!(len = points.len(), "bezier chain needs anchor/control/control triples");
            return self;
        }

        let mut outline = Vec::new();
        for (i, triple) in points.chunks_exact(3).enumerate() {
            let p0 = triple[0];
            let p1 = triple[1];
            let p2 = triple[2];
            let p3 = points[((i + 1) * 3) % points.len()];

            let hull = distance(p0, p1) + distance(p1, p2) + distance(p2, p3);
            let steps = ((hull / 2.0).ceil() as usize).clamp(4, 256);
            for s in 0..steps {
                outline.push(cubic(p0, p1, p2, p3, s as f64 / steps as f64));
            }
        }
        self.add_polygon(&outline)
    }

    /// Render every outline into a `width` x `height` mask.
    pub fn render(&self, width: usize, height: usize, antialias: bool, supersample: u32) -> Result<SelectionMask> {
        let factor = if antialias { supersample.max(1) as usize } else { 1 };
        let super_width = width * factor;
        let super_height = height * factor;

        let mask = SelectionMask::new(width, height)?;
        if width == 0 || height == 0 || self.outlines.is_empty() {
            return Ok(mask);
        }

        let mut scanlines = try_alloc("scanlines", 1, super_height, Vec::<i32>::new())?;
        for outline in &self.outlines {
            let scaled: Vec<(i32, i32)> = outline
                .iter()
                .map(|&(x, y)| ((x * factor as f64).round() as i32, (y * factor as f64).round() as i32))
                .collect();
            for (i, &from) in scaled.iter().enumerate() {
                let to = scaled[(i + 1) % scaled.len()];
                convert_line(&mut scanlines, from, to);
            }
        }

        let mut unmatched = 0usize;
        for row in scanlines.iter_mut().filter(|row| row.len() % 2 == 1) {
            row.pop();
            unmatched += 1;
        }
        if unmatched > 0 {
            warn!(rows = unmatched, "odd scanline crossing count, dropped trailing crossings");
        }

        let mut coverage = mask.into_array();
        fill_rows(&mut coverage, &scanlines, factor, super_width);

        debug!(
            width,
            height,
            factor,
            outlines = self.outlines.len(),
            "scan converted"
        );
        Ok(SelectionMask::from_array(coverage))
    }
}

/// Rasterize one closed polygon.
///
/// Fewer than three distinct points select nothing.
pub fn rasterize<P: Into<(f64, f64)> + Copy>(
    points: &[P],
    width: usize,
    height: usize,
    antialias: bool,
    supersample: u32,
) -> Result<SelectionMask> {
    let outline: Vec<(f64, f64)> = points.iter().map(|&p| p.into()).collect();

    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(3);
    for &p in &outline {
        if !distinct.contains(&p) {
            distinct.push(p);
            if distinct.len() == 3 {
                break;
            }
        }
    }
    if distinct.len() < 3 {
        return SelectionMask::new(width, height);
    }

    ScanConverter::new()
        .add_polygon(&outline)
        .render(width, height, antialias, supersample)
}

/// Fill the spans of each output row from `factor` super-rows of crossings.
fn fill_rows(coverage: &mut Array2<u8>, scanlines: &[Vec<i32>], factor: usize, super_width: usize) {
    let divisor = (factor * factor) as u32;

    coverage
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut out)| {
            let mut vals = vec![0u32; super_width];
            for crossings in &scanlines[row * factor..(row + 1) * factor] {
                for pair in crossings.chunks_exact(2) {
                    let x1 = pair[0].clamp(0, super_width as i32) as usize;
                    let x2 = pair[1].clamp(0, super_width as i32) as usize;
                    for v in &mut vals[x1..x2] {
                        *v += 255;
                    }
                }
            }

            for (x, pixel) in out.iter_mut().enumerate() {
                let sum: u32 = vals[x * factor..(x + 1) * factor].iter().sum();
                *pixel = (sum / divisor).min(255) as u8;
            }
        });
}

/// Record the row crossings of the edge `from`-`to`.
///
/// Horizontal edges cross nothing. The edge is clipped to the rows of
/// `scanlines` and walked one row at a time, inserting the crossing x into
/// the row's sorted list.
fn convert_line(scanlines: &mut [Vec<i32>], from: (i32, i32), to: (i32, i32)) {
    let height = scanlines.len() as i32;
    let ((mut x1, mut y1), (mut x2, mut y2)) = if from.1 <= to.1 { (from, to) } else { (to, from) };

    if y1 == y2 {
        return;
    }

    if y1 < 0 {
        if y2 < 0 {
            return;
        }
        if x1 != x2 {
            let slope = (y2 - y1) as f64 / (x2 - x1) as f64;
            x1 = x2 + (0.5 + (0 - y2) as f64 / slope) as i32;
        }
        y1 = 0;
    }

    if y2 >= height {
        if y1 >= height {
            return;
        }
        if x1 != x2 {
            let slope = (y2 - y1) as f64 / (x2 - x1) as f64;
            x2 = x1 + (0.5 + (height - y1) as f64 / slope) as i32;
        }
        y2 = height;
    }

    if y1 == y2 {
        return;
    }

    let mut dx = x2 - x1;
    let dy = y2 - y1;
    let mut row = y1 as usize;

    if dx.abs() > dy {
        let inc = dx.signum();
        dx = dx.abs();
        let mut error = -dx / 2;
        while x1 != x2 {
            error += dy;
            if error > 0 {
                error -= dx;
                if let Some(line) = scanlines.get_mut(row) {
                    insert_sorted(line, x1);
                }
                row += 1;
            }
            x1 += inc;
        }
    } else {
        let inc = dx.signum();
        dx = dx.abs();
        let mut error = -dy / 2;
        for _ in 0..dy {
            if let Some(line) = scanlines.get_mut(row) {
                insert_sorted(line, x1);
            }
            row += 1;

            error += dx;
            if error > 0 {
                error -= dy;
                x1 += inc;
            }
        }
    }
}

#[inline]
fn insert_sorted(line: &mut Vec<i32>, x: i32) {
    let at = line.partition_point(|&v| v <= x);
    line.insert(at, x);
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn cubic(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), t: f64) -> (f64, f64) {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    (
        b0 * p0.0 + b1 * p1.0 + b2 * p2.0 + b3 * p3.0,
        b0 * p0.1 + b1 * p1.1 + b2 * p2.1 + b3 * p3.1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_rectangle_covers_exact_area() {
        let mask = ScanConverter::new()
            .add_rectangle(3.0, 4.0, 12.0, 7.0)
            .render(20, 20, false, SUPERSAMPLE)
            .unwrap();

        assert_eq!(mask.covered_count(), 12 * 7);
        assert_eq!(mask.bounds(), Some((3, 4, 12, 7)));
        assert_eq!(mask.coverage_sum(), 12 * 7 * 255);
    }

    #[test]
    fn test_polygon_from_points() {
        let square = [
            Point::new(2, 2),
            Point::new(8, 2),
            Point::new(8, 8),
            Point::new(2, 8),
        ];
        let mask = rasterize(&square, 10, 10, false, SUPERSAMPLE).unwrap();
        assert_eq!(mask.covered_count(), 36);
    }

    #[test]
    fn test_antialias_softens_only_the_boundary() {
        let mask = ScanConverter::new()
            .add_rectangle(2.5, 2.5, 5.0, 5.0)
            .render(10, 10, true, 3)
            .unwrap();

        for y in 0..10 {
            for x in 0..10 {
                let v = mask.get(x, y);
                let boundary = (x == 2 || x == 7) && (2..=7).contains(&y)
                    || (y == 2 || y == 7) && (2..=7).contains(&x);
                let inside = (3..7).contains(&x) && (3..7).contains(&y);

                if boundary {
                    assert!(v > 0 && v < 255, "({x}, {y}) = {v}");
                } else if inside {
                    assert_eq!(v, 255, "({x}, {y})");
                } else {
                    assert_eq!(v, 0, "({x}, {y})");
                }
            }
        }
        // One of three sub-columns covered
        assert_eq!(mask.get(2, 5), 85);
    }

    #[test]
    fn test_degenerate_input_selects_nothing() {
        let line = [(1.0, 1.0), (8.0, 8.0), (1.0, 1.0)];
        assert_eq!(rasterize(&line, 10, 10, false, 3).unwrap().covered_count(), 0);

        let empty: [(f64, f64); 0] = [];
        assert_eq!(rasterize(&empty, 10, 10, true, 3).unwrap().covered_count(), 0);
    }

    #[test]
    fn test_clips_to_mask() {
        let mask = ScanConverter::new()
            .add_rectangle(-5.0, -5.0, 10.0, 30.0)
            .render(8, 8, false, 1)
            .unwrap();
        assert_eq!(mask.covered_count(), 5 * 8);
    }

    #[test]
    fn test_overlapping_outlines_use_even_odd() {
        let mask = ScanConverter::new()
            .add_rectangle(0.0, 0.0, 10.0, 10.0)
            .add_rectangle(3.0, 3.0, 4.0, 4.0)
            .render(10, 10, false, 1)
            .unwrap();
        assert_eq!(mask.covered_count(), 100 - 16);
        assert_eq!(mask.get(5, 5), 0);
    }

    #[test]
    fn test_ellipse_area() {
        let mask = ScanConverter::new()
            .add_ellipse(50.0, 50.0, 30.0, 20.0)
            .render(100, 100, false, 1)
            .unwrap();

        let expected = std::f64::consts::PI * 30.0 * 20.0;
        let area = mask.covered_count() as f64;
        assert!((area - expected).abs() / expected < 0.03, "area {area}");
        assert_eq!(mask.get(50, 50), 255);
        assert_eq!(mask.get(50, 25), 0);
    }

    #[test]
    fn test_bezier_chain() {
        // Straight-sided bezier square: controls on the edges
        let chain = [
            (2.0, 2.0),
            (4.0, 2.0),
            (6.0, 2.0),
            (8.0, 2.0),
            (8.0, 4.0),
            (8.0, 6.0),
            (8.0, 8.0),
            (6.0, 8.0),
            (4.0, 8.0),
            (2.0, 8.0),
            (2.0, 6.0),
            (2.0, 4.0),
        ];
        let mask = ScanConverter::new().add_bezier(&chain).render(10, 10, false, 1).unwrap();
        assert_eq!(mask.covered_count(), 36);

        let mut invalid = ScanConverter::new();
        invalid.add_bezier(&chain[..4]);
        assert_eq!(invalid.outline_count(), 0);
    }

    #[test]
    fn test_self_intersection_does_not_panic() {
        // Bow tie with a vertex on a scanline
        let bow = [(0.0, 0.0), (9.0, 9.0), (9.0, 0.0), (0.0, 9.0), (4.0, 4.0)];
        let mask = rasterize(&bow, 10, 10, true, 3).unwrap();
        assert!(mask.covered_count() > 0);
    }
}
