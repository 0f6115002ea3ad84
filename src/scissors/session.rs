//! One interactive scissors edit over one image.

use tracing::{debug, trace};

use super::contour::{ContourBuilder, ContourEvent, ContourState};
use super::cost_map::{CostField, GradientCostMap};
use super::options::ScissorsOptions;
use crate::error::Result;
use crate::geometry::Point;
use crate::image::ImageSource;
use crate::selection::{scan_convert, SelectionCombiner, SelectionMask};

/// Owns the cost map, the contour under construction and the settings of a
/// single editing session.
///
/// Sessions are independent; tracing several images at once just means
/// holding several sessions.
pub struct ScissorsSession<I> {
    cost_map: GradientCostMap<I>,
    contour: ContourBuilder,
    options: ScissorsOptions,
}

impl<I: ImageSource> ScissorsSession<I> {
    pub fn new(image: I, options: ScissorsOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            cost_map: GradientCostMap::new(image),
            contour: ContourBuilder::new(options.path, options.close_radius),
            options,
        })
    }

    pub fn options(&self) -> &ScissorsOptions {
        &self.options
    }

    pub fn contour(&self) -> &ContourBuilder {
        &self.contour
    }

    pub fn cost_map(&self) -> &GradientCostMap<I> {
        &self.cost_map
    }

    pub fn state(&self) -> ContourState {
        self.contour.state()
    }

    fn width(&self) -> usize {
        self.cost_map.image().width()
    }

    fn height(&self) -> usize {
        self.cost_map.image().height()
    }

    fn snap(&mut self, p: Point) -> Result<Point> {
        if self.options.snap_to_edges {
            self.cost_map.snap_to_edge(p, self.options.snap_radius)
        } else {
            Ok(p.clamp_to(self.width(), self.height()))
        }
    }

    /// Handle a click at `p`.
    ///
    /// The first click starts the contour. Later clicks close it when they
    /// land near the first vertex and otherwise add a vertex on the nearest
    /// strong edge. Clicks on a closed contour are ignored.
    pub fn click(&mut self, p: Point) -> Result<ContourEvent> {
        let event = match self.contour.state() {
            ContourState::Closed => ContourEvent::Ignored,
            ContourState::Empty => {
                let p = self.snap(p)?;
                self.contour.place_first_vertex(p)
            }
            ContourState::Building => {
                let first = self.contour.vertices()[0];
                if p.within(first, self.options.close_radius) {
                    self.contour.place_vertex(&mut self.cost_map, p)?
                } else {
                    let p = self.snap(p)?;
                    self.contour.place_vertex(&mut self.cost_map, p)?
                }
            }
        };
        trace!(?p, ?event, "click");
        Ok(event)
    }

    /// Drag vertex `index` to `p` (snapped like a click).
    pub fn move_vertex(&mut self, index: usize, p: Point) -> Result<bool> {
        let p = self.snap(p)?;
        self.contour.adjust_vertex(&mut self.cost_map, index, p)
    }

    /// Split the segment passing near `p` with a new vertex on its path.
    ///
    /// Returns `false` when no segment passes within the close radius.
    pub fn insert_vertex_on_curve(&mut self, p: Point) -> Result<bool> {
        let Some(segment) = self.contour.segment_at(p, self.options.close_radius) else {
            return Ok(false);
        };
        let on_curve = self.contour.segments()[segment]
            .path
            .points
            .iter()
            .copied()
            .min_by_key(|q| q.distance_squared(p))
            .unwrap_or(p);
        self.contour.insert_vertex(&mut self.cost_map, segment, on_curve)
    }

    pub fn close(&mut self) -> Result<ContourEvent> {
        self.contour.close(&mut self.cost_map)
    }

    pub fn reset(&mut self) {
        self.contour.reset();
    }

    pub fn polyline(&self) -> Vec<Point> {
        self.contour.polyline()
    }

    /// Coverage mask of the closed contour, boundary pixels included.
    ///
    /// The traced outline is first settled onto the inner side of its edge
    /// (see [`settle_inside_ridge`]). Open contours and contours with fewer
    /// than three vertices select nothing.
    pub fn rasterize(&mut self) -> Result<SelectionMask> {
        let (width, height) = (self.width(), self.height());
        if !self.contour.is_closed() || self.contour.vertices().len() < 3 {
            return SelectionMask::new(width, height);
        }

        let traced = self.polyline();
        let outline = settle_inside_ridge(&mut self.cost_map, &traced)?;
        let mut mask = scan_convert::rasterize(
            &outline,
            width,
            height,
            self.options.antialias,
            self.options.supersample,
        )?;
        mask.stamp_points(&outline, 255);

        debug!(
            vertices = self.contour.vertices().len(),
            outline = outline.len(),
            covered = mask.covered_count(),
            "scissors mask"
        );
        Ok(mask)
    }

    /// Hand the finished mask to `combiner` and start over.
    ///
    /// Does nothing and returns `false` unless the contour is closed.
    pub fn commit<C: SelectionCombiner + ?Sized>(&mut self, combiner: &mut C) -> Result<bool> {
        if !self.contour.is_closed() {
            return Ok(false);
        }

        let mask = self.rasterize()?;
        combiner.combine(
            &mask,
            self.options.operation,
            self.options.feather,
            self.options.feather_radius,
        )?;
        self.reset();
        Ok(true)
    }
}

/// Move traced pixels off the outer half of an edge ridge.
///
/// A sharp step lights up the pixels on both sides of it equally, so a path
/// can run along either side. Each pixel of the closed `outline` whose
/// neighbour towards the interior is at least as strong an edge is replaced
/// by that neighbour, which puts the outline on the object's own boundary
/// pixels whichever side the path took. Consecutive duplicates are merged.
pub fn settle_inside_ridge<F: CostField + ?Sized>(
    field: &mut F,
    outline: &[Point],
) -> Result<Vec<Point>> {
    let n = outline.len();
    let twice_area: i64 = (0..n)
        .map(|i| {
            let (a, b) = (outline[i], outline[(i + 1) % n]);
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    if n < 3 || twice_area == 0 {
        return Ok(outline.to_vec());
    }

    let mut settled: Vec<Point> = Vec::with_capacity(n);
    for (i, &p) in outline.iter().enumerate() {
        let prev = outline[(i + n - 1) % n];
        let next = outline[(i + 1) % n];
        let (tx, ty) = ((next.x - prev.x) as f64, (next.y - prev.y) as f64);
        // Interior lies on the left of travel for positive area
        let (nx, ny) = if twice_area > 0 { (-ty, tx) } else { (ty, -tx) };
        let len = nx.hypot(ny);

        let mut q = p;
        if len > 0.0 {
            let inward = Point::new(
                p.x + (nx / len).round() as i32,
                p.y + (ny / len).round() as i32,
            );
            let here = field.sample(p.x, p.y)?.gradient;
            if here > 0 && field.sample(inward.x, inward.y)?.gradient >= here {
                q = inward;
            }
        }
        if settled.last() != Some(&q) {
            settled.push(q);
        }
    }
    while settled.len() > 1 && settled.first() == settled.last() {
        settled.pop();
    }
    Ok(settled)
}

/// Trace a closed outline through `clicks` and return its mask.
pub fn trace_selection<I: ImageSource>(
    image: I,
    clicks: &[Point],
    options: ScissorsOptions,
) -> Result<SelectionMask> {
    let mut session = ScissorsSession::new(image, options)?;
    for &p in clicks {
        session.click(p)?;
    }
    session.close()?;
    session.rasterize()
}
