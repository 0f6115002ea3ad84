//! Lazily computed, tiled gradient cost map.
//!
//! Every pixel gets a [`CostSample`]: the edge strength at that pixel and the
//! quantized direction of the image gradient. Samples are computed a tile at
//! a time the first time any pixel of the tile is queried and are kept for the
//! lifetime of the map.
//!
//! Stored gradients follow the "higher is stronger" convention: 255 marks the
//! strongest possible edge, 0 a flat area. The path finder inverts the value
//! when it turns strength into cost.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{try_alloc, Result};
use crate::filters::edge::{max_channel_derivatives, smooth_u8, MAX_DERIVATIVE};
use crate::geometry::{Point, Rect};
use crate::image::ImageSource;

/// Edge length of a cost tile in pixels.
pub const TILE_SIZE: usize = 64;

/// Source pixels fetched around a tile: one for the blur, one for the
/// derivative.
const HALO: usize = 2;

/// `sqrt(127^2 + 127^2)`, the largest gradient the derivatives can produce.
pub const MAX_GRADIENT: f64 = 179.606;

/// Gradients at or below this (unscaled) magnitude have no direction.
pub const MIN_GRADIENT: f64 = 63.0;

/// Direction value reserved for weak-gradient pixels.
pub const DIRECTIONLESS: u8 = 255;

/// Edge strength and gradient direction of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CostSample {
    /// Edge strength, 0 (flat) to 255 (strongest).
    pub gradient: u8,
    /// Gradient angle in (-π/2, π/2] quantized to 0..=254, or
    /// [`DIRECTIONLESS`].
    pub direction: u8,
}

impl CostSample {
    /// Sample used outside the image and on its one pixel border.
    pub const NONE: CostSample = CostSample {
        gradient: 0,
        direction: DIRECTIONLESS,
    };

    /// Build a sample from horizontal and vertical derivatives in
    /// `±MAX_DERIVATIVE`.
    pub fn from_derivatives(horizontal: i32, vertical: i32) -> Self {
        let h = horizontal.clamp(-MAX_DERIVATIVE, MAX_DERIVATIVE) as f64;
        let v = vertical.clamp(-MAX_DERIVATIVE, MAX_DERIVATIVE) as f64;

        let magnitude = (h * h + v * v).sqrt();
        let gradient = (magnitude * 255.0 / MAX_GRADIENT).min(255.0) as u8;

        let direction = if magnitude > MIN_GRADIENT {
            let angle = if horizontal == 0 {
                if vertical > 0 {
                    FRAC_PI_2
                } else {
                    -FRAC_PI_2
                }
            } else {
                (v / h).atan()
            };
            (254.0 * (angle + FRAC_PI_2) / PI).round() as u8
        } else {
            DIRECTIONLESS
        };

        CostSample { gradient, direction }
    }

    pub fn is_directionless(&self) -> bool {
        self.direction == DIRECTIONLESS
    }
}

/// A source of per-pixel cost samples the path finder can search over.
pub trait CostField {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Sample at `(x, y)`; positions outside the field yield [`CostSample::NONE`].
    fn sample(&mut self, x: i32, y: i32) -> Result<CostSample>;

    /// Hint that every pixel of `rect` is about to be sampled.
    fn prepare(&mut self, _rect: Rect) -> Result<()> {
        Ok(())
    }
}

/// A fully materialized field, handy for synthetic cost landscapes.
impl CostField for Array2<CostSample> {
    fn width(&self) -> usize {
        self.dim().1
    }

    fn height(&self) -> usize {
        self.dim().0
    }

    fn sample(&mut self, x: i32, y: i32) -> Result<CostSample> {
        if x < 0 || y < 0 {
            return Ok(CostSample::NONE);
        }
        Ok(self
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(CostSample::NONE))
    }
}

type TileKey = (usize, usize);

/// Gradient cost map over one image, computed on demand.
pub struct GradientCostMap<I> {
    image: I,
    tiles: HashMap<TileKey, Array2<CostSample>>,
}

impl<I: ImageSource> GradientCostMap<I> {
    pub fn new(image: I) -> Self {
        Self {
            image,
            tiles: HashMap::new(),
        }
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    /// Number of tiles computed so far.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the tile holding pixel `(x, y)` has been computed.
    pub fn is_tile_cached(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && self.tiles.contains_key(&(x as usize / TILE_SIZE, y as usize / TILE_SIZE))
    }

    fn in_image(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.image.width() && (y as usize) < self.image.height()
    }

    /// Cost sample at `(x, y)`, computing its tile if needed.
    ///
    /// Positions outside the image yield [`CostSample::NONE`].
    pub fn sample(&mut self, x: i32, y: i32) -> Result<CostSample> {
        if !self.in_image(x, y) {
            return Ok(CostSample::NONE);
        }

        let (x, y) = (x as usize, y as usize);
        let key = (x / TILE_SIZE, y / TILE_SIZE);

        let tile = match self.tiles.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(compute_tile(&self.image, key)?),
        };

        Ok(tile[[y % TILE_SIZE, x % TILE_SIZE]])
    }

    /// Compute every missing tile overlapping `rect`, in parallel.
    pub fn ensure_region(&mut self, rect: Rect) -> Result<()> {
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;

        let x1 = rect.x.clamp(0, width);
        let y1 = rect.y.clamp(0, height);
        let x2 = rect.right().clamp(0, width);
        let y2 = rect.bottom().clamp(0, height);
        if x1 >= x2 || y1 >= y2 {
            return Ok(());
        }

        let tx_range = (x1 as usize / TILE_SIZE)..=((x2 - 1) as usize / TILE_SIZE);
        let ty_range = (y1 as usize / TILE_SIZE)..=((y2 - 1) as usize / TILE_SIZE);

        let missing: Vec<TileKey> = ty_range
            .flat_map(|ty| tx_range.clone().map(move |tx| (tx, ty)))
            .filter(|key| !self.tiles.contains_key(key))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        let image = &self.image;
        let computed = missing
            .par_iter()
            .map(|&key| compute_tile(image, key).map(|tile| (key, tile)))
            .collect::<Result<Vec<_>>>()?;

        debug!(tiles = computed.len(), "computed cost tiles");
        self.tiles.extend(computed);
        Ok(())
    }

    /// Move `p` onto the strongest nearby edge.
    ///
    /// Searches the window `[p - radius, p + radius)` clamped to the image and
    /// returns the pixel maximising `gradient / (1 + distance to p)`. The first
    /// maximum in row-major order wins. When nothing in the window has any
    /// gradient, `p` clamped to the image is returned.
    pub fn snap_to_edge(&mut self, p: Point, radius: u32) -> Result<Point> {
        let width = self.image.width();
        let height = self.image.height();
        if width == 0 || height == 0 {
            return Ok(p);
        }

        let center = p.clamp_to(width, height);
        let r = radius as i32;
        let x1 = (center.x - r).max(0);
        let y1 = (center.y - r).max(0);
        let x2 = (center.x + r).min(width as i32);
        let y2 = (center.y + r).min(height as i32);

        self.ensure_region(Rect::new(x1, y1, (x2 - x1).max(0) as usize, (y2 - y1).max(0) as usize))?;

        let mut best = center;
        let mut best_weight = 0.0f64;

        for y in y1..y2 {
            for x in x1..x2 {
                let sample = self.sample(x, y)?;
                if sample.gradient == 0 {
                    continue;
                }
                let distance = (center.distance_squared(Point::new(x, y)) as f64).sqrt();
                let weight = sample.gradient as f64 / (1.0 + distance);
                if weight > best_weight {
                    best_weight = weight;
                    best = Point::new(x, y);
                }
            }
        }

        Ok(best)
    }
}

impl<I: ImageSource> CostField for GradientCostMap<I> {
    fn width(&self) -> usize {
        self.image.width()
    }

    fn height(&self) -> usize {
        self.image.height()
    }

    fn sample(&mut self, x: i32, y: i32) -> Result<CostSample> {
        GradientCostMap::sample(self, x, y)
    }

    fn prepare(&mut self, rect: Rect) -> Result<()> {
        self.ensure_region(rect)
    }
}

/// Compute the cost samples of one tile.
///
/// A halo of source pixels around the tile makes the result independent of
/// tile boundaries; only the outermost pixels of the image lack a full
/// neighbourhood and get [`CostSample::NONE`].
fn compute_tile<I: ImageSource>(image: &I, (tx, ty): TileKey) -> Result<Array2<CostSample>> {
    let image_width = image.width();
    let image_height = image.height();

    let x0 = tx * TILE_SIZE;
    let y0 = ty * TILE_SIZE;
    let width = TILE_SIZE.min(image_width - x0);
    let height = TILE_SIZE.min(image_height - y0);

    let hx0 = x0.saturating_sub(HALO);
    let hy0 = y0.saturating_sub(HALO);
    let hx1 = (x0 + width + HALO).min(image_width);
    let hy1 = (y0 + height + HALO).min(image_height);

    let source = image.region(hx0, hy0, hx1 - hx0, hy1 - hy0)?;
    let smoothed = smooth_u8(source);
    let (horizontal, vertical) = max_channel_derivatives(smoothed.view());

    let mut samples = try_alloc("cost tile", width, height, CostSample::NONE)?;

    for i in 0..height {
        let y = y0 + i;
        if y == 0 || y + 1 == image_height {
            continue;
        }
        for j in 0..width {
            let x = x0 + j;
            if x == 0 || x + 1 == image_width {
                continue;
            }
            let (by, bx) = (y - hy0, x - hx0);
            samples[i * width + j] =
                CostSample::from_derivatives(horizontal[[by, bx]], vertical[[by, bx]]);
        }
    }

    debug!(tx, ty, width, height, "gradient tile");
    Ok(Array2::from_shape_vec((height, width), samples)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::RasterImage;

    /// 100x100 black image with a white square covering 30..70 on both axes.
    fn square_image() -> RasterImage {
        let mut image = RasterImage::filled(100, 100, &[0, 0, 0]);
        image.fill_rect(30, 30, 40, 40, &[255, 255, 255]);
        image
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let image = RasterImage::filled(40, 30, &[120, 80, 10]);
        let mut map = GradientCostMap::new(&image);

        for (x, y) in [(0, 0), (10, 10), (39, 29), (20, 15)] {
            assert_eq!(map.sample(x, y).unwrap(), CostSample::NONE);
        }
    }

    #[test]
    fn test_outside_image_is_sentinel() {
        let image = square_image();
        let mut map = GradientCostMap::new(&image);

        assert_eq!(map.sample(-1, 5).unwrap(), CostSample::NONE);
        assert_eq!(map.sample(5, 100).unwrap(), CostSample::NONE);
        assert_eq!(map.tile_count(), 0);
    }

    #[test]
    fn test_square_edges_are_strong() {
        let image = square_image();
        let mut map = GradientCostMap::new(&image);

        // Left edge, inner band: horizontal gradient, vertical edge
        let left = map.sample(30, 50).unwrap();
        assert_eq!(left.gradient, 180);
        assert_eq!(left.direction, 127);

        // Top edge: vertical gradient
        let top = map.sample(50, 30).unwrap();
        assert_eq!(top.gradient, 180);
        assert_eq!(top.direction, 0);

        // Corner is stronger than either side
        let corner = map.sample(30, 30).unwrap();
        assert!(corner.gradient > left.gradient);

        // Interior is flat
        assert_eq!(map.sample(50, 50).unwrap(), CostSample::NONE);
    }

    #[test]
    fn test_tiles_are_seamless() {
        let image = square_image();
        let mut map = GradientCostMap::new(&image);

        // The right edge of the square straddles the tile boundary at 64
        let across = map.sample(69, 63).unwrap();
        let below = map.sample(69, 64).unwrap();
        assert_eq!(across, below);
        assert_eq!(map.sample(69, 50).unwrap(), across);
    }

    #[test]
    fn test_sample_is_idempotent() {
        let image = square_image();
        let mut map = GradientCostMap::new(&image);
        assert!(!map.is_tile_cached(10, 30));

        let first: Vec<_> = (0..100).map(|i| map.sample(i, 30).unwrap()).collect();
        let tiles = map.tile_count();
        assert!(map.is_tile_cached(10, 30));
        assert!(map.is_tile_cached(99, 30));
        assert!(!map.is_tile_cached(10, 80));
        assert!(!map.is_tile_cached(-1, 30));
        let second: Vec<_> = (0..100).map(|i| map.sample(i, 30).unwrap()).collect();

        assert_eq!(first, second);
        assert_eq!(map.tile_count(), tiles);
    }

    #[test]
    fn test_ensure_region_matches_lazy_sampling() {
        let image = square_image();
        let mut eager = GradientCostMap::new(&image);
        let mut lazy = GradientCostMap::new(&image);

        eager.ensure_region(Rect::new(0, 0, 100, 100)).unwrap();
        assert_eq!(eager.tile_count(), 4);

        for y in (0..100).step_by(7) {
            for x in (0..100).step_by(3) {
                assert_eq!(eager.sample(x, y).unwrap(), lazy.sample(x, y).unwrap());
            }
        }
    }

    #[test]
    fn test_image_border_is_sentinel() {
        let mut image = RasterImage::filled(20, 20, &[0]);
        image.fill_rect(0, 0, 10, 20, &[255]);
        let mut map = GradientCostMap::new(&image);

        assert_eq!(map.sample(9, 0).unwrap(), CostSample::NONE);
        assert_eq!(map.sample(0, 10).unwrap(), CostSample::NONE);
        assert!(map.sample(9, 10).unwrap().gradient > 0);
    }

    #[test]
    fn test_from_derivatives_quantization() {
        let weak = CostSample::from_derivatives(30, 20);
        assert!(weak.is_directionless());
        assert!(weak.gradient > 0);

        let diagonal = CostSample::from_derivatives(127, 127);
        assert_eq!(diagonal.direction, 191);
        assert_eq!(CostSample::from_derivatives(127, -127).direction, 64);
        assert_eq!(diagonal.gradient, 254);

        let up = CostSample::from_derivatives(0, 127);
        assert_eq!(up.direction, 254);
    }

    #[test]
    fn test_snap_to_edge_prefers_near_edges() {
        let image = square_image();
        let mut map = GradientCostMap::new(&image);

        // Two pixels inside the left edge snaps onto it
        assert_eq!(map.snap_to_edge(Point::new(32, 50), 16).unwrap(), Point::new(30, 50));
        // Diagonally inside the corner snaps to the corner
        assert_eq!(map.snap_to_edge(Point::new(32, 32), 16).unwrap(), Point::new(30, 30));
        // Nothing nearby keeps the point
        assert_eq!(map.snap_to_edge(Point::new(5, 5), 4).unwrap(), Point::new(5, 5));
    }

    #[test]
    fn test_array_field_samples() {
        let mut field = Array2::from_elem((3, 4), CostSample { gradient: 9, direction: 3 });
        assert_eq!(CostField::sample(&mut field, 3, 2).unwrap().gradient, 9);
        assert_eq!(CostField::sample(&mut field, 4, 2).unwrap(), CostSample::NONE);
        assert_eq!(CostField::sample(&mut field, -1, 0).unwrap(), CostSample::NONE);
    }
}
