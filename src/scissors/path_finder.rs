//! Least-cost pixel paths over a [`CostField`].
//!
//! The search is a single raster sweep over a working rectangle that starts
//! at the seed pixel. Each cell takes the cheapest of its already visited
//! neighbours and then offers itself as a cheaper predecessor to those same
//! neighbours. This is an approximation of Dijkstra's algorithm: it is exact
//! for paths that are monotone in the sweep direction and usually very close
//! otherwise.

use std::f64::consts::SQRT_2;

use tracing::{debug, warn};

use super::cost_map::CostField;
use super::options::PathOptions;
use crate::error::{Result, ScissorsError};
use crate::geometry::{line_points, Point, Rect};

/// Offsets from a cell to its neighbour, indexed by link slot.
///
/// Slots `k` and `k ± 4` point in opposite directions and share the link
/// class `k % 4`: horizontal, vertical and the two diagonals.
pub const MOVES: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 1),
    (1, 1),
    (-1, 0),
    (0, -1),
    (1, -1),
    (-1, -1),
];

/// Back link stored in the cell the sweep starts from.
const SEED: u8 = 9;
const UNSET: u8 = u8::MAX;

/// Agreement between a quantized gradient direction and a link class.
/// Lower is better; the directionless row is a flat 255 for every class.
pub const DIRECTION_VALUE: [[i32; 4]; 256] = direction_table();

const fn direction_table() -> [[i32; 4]; 256] {
    let mut table = [[255; 4]; 256];
    let mut i = 0;
    while i < 255 {
        let d = i as i32;
        table[i] = [
            (127 - (127 - d).abs()) * 2,
            (127 - d).abs() * 2,
            (191 - d).abs() * 2,
            (63 - d).abs() * 2,
        ];
        i += 1;
    }
    table
}

#[inline]
fn opposite(slot: usize) -> u8 {
    ((slot + 4) % 8) as u8
}

/// Cost of linking the cell `(x, y)` to its neighbour in `slot`.
///
/// Combines the inverted edge strength at `(x, y)` (scaled by √2 for
/// diagonal links) with how well the gradient directions of both cells agree
/// with the link. Weak or missing edges are expensive.
pub fn link_cost<F: CostField + ?Sized>(
    field: &mut F,
    x: i32,
    y: i32,
    slot: usize,
    options: &PathOptions,
) -> Result<u32> {
    let class = slot % 4;
    let here = field.sample(x, y)?;

    let inverted = (255 - here.gradient) as i32;
    let magnitude = if class > 1 {
        (inverted as f64 * SQRT_2) as i32
    } else {
        inverted
    };
    let mut value = (magnitude as f64 * options.gradient_weight) as i32;

    let (dx, dy) = MOVES[slot];
    let there = field.sample(x + dx, y + dy)?;
    let agreement = DIRECTION_VALUE[here.direction as usize][class]
        + DIRECTION_VALUE[there.direction as usize][class];
    value += (agreement as f64 * options.direction_weight) as i32;

    Ok(value.max(0) as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Result of the cost sweep.
    Optimal,
    /// Bresenham line, used when the sweep could not produce a path.
    StraightLine,
}

/// Pixels from start to end, both included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub points: Vec<Point>,
    /// Cumulative cost at the end pixel; 0 for straight lines.
    pub cost: u32,
    pub kind: PathKind,
}

impl Path {
    fn straight(from: Point, to: Point) -> Self {
        Path {
            points: line_points(from, to),
            cost: 0,
            kind: PathKind::StraightLine,
        }
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct DpCell {
    cost: u32,
    link: u8,
}

impl DpCell {
    const EMPTY: DpCell = DpCell { cost: 0, link: UNSET };
}

/// Path search with a reusable dynamic programming buffer.
#[derive(Debug, Default)]
pub struct PathFinder {
    options: PathOptions,
    scratch: Vec<DpCell>,
}

impl PathFinder {
    pub fn new(options: PathOptions) -> Self {
        Self {
            options,
            scratch: Vec::new(),
        }
    }

    pub fn options(&self) -> &PathOptions {
        &self.options
    }

    /// Rectangle searched for a path from `start` to `end` in a
    /// `width` x `height` image.
    ///
    /// The endpoint bounding box grows past `end` on each axis, so `start`
    /// always sits on a corner of the result.
    pub fn working_rect(&self, start: Point, end: Point, width: usize, height: usize) -> Rect {
        let start = start.clamp_to(width, height);
        let end = end.clamp_to(width, height);
        let (x1, x2) = self.extend_axis(start.x, end.x, width as i32);
        let (y1, y2) = self.extend_axis(start.y, end.y, height as i32);
        Rect::new(x1, y1, (x2 - x1) as usize, (y2 - y1) as usize)
    }

    fn extend_axis(&self, from: i32, to: i32, limit: i32) -> (i32, i32) {
        let mut low = from.min(to);
        let mut high = from.max(to) + 1;
        let extend = ((high - low) as f64 * self.options.extend_by) as i32 + self.options.fixed_margin;

        if to >= from {
            high += extend.clamp(0, (limit - high).max(0));
        } else {
            low -= extend.clamp(0, low);
        }
        (low, high)
    }

    /// Find the cheapest path from `start` to `end`.
    ///
    /// Both points are clamped to the field first. Only a failure to
    /// allocate the search buffer is an error; anything else that keeps the
    /// sweep from producing a path degrades to a straight line.
    pub fn find_path<F: CostField + ?Sized>(
        &mut self,
        field: &mut F,
        start: Point,
        end: Point,
    ) -> Result<Path> {
        let (width, height) = (field.width(), field.height());
        if width == 0 || height == 0 {
            return Ok(Path::straight(start, end));
        }

        let start = start.clamp_to(width, height);
        let end = end.clamp_to(width, height);
        let rect = self.working_rect(start, end, width, height);
        if rect.is_empty() {
            return Ok(Path::straight(start, end));
        }

        field.prepare(rect)?;
        self.reset_scratch(rect)?;
        self.sweep(field, rect, start)?;

        let path = self.trace_back(rect, start, end);
        debug!(
            ?start,
            ?end,
            width = rect.width,
            height = rect.height,
            cost = path.cost,
            len = path.points.len(),
            "scissors path"
        );
        Ok(path)
    }

    fn reset_scratch(&mut self, rect: Rect) -> Result<()> {
        let len = rect
            .width
            .checked_mul(rect.height)
            .ok_or_else(|| ScissorsError::allocation("path buffer", rect.width, rect.height))?;

        self.scratch.clear();
        self.scratch
            .try_reserve_exact(len)
            .map_err(|_| ScissorsError::allocation("path buffer", rect.width, rect.height))?;
        self.scratch.resize(len, DpCell::EMPTY);
        Ok(())
    }

    fn sweep<F: CostField + ?Sized>(&mut self, field: &mut F, rect: Rect, seed: Point) -> Result<()> {
        let dirx = if seed.x == rect.x { 1 } else { -1 };
        let diry = if seed.y == rect.y { 1 } else { -1 };
        let linkdir = dirx * diry;

        // Slots of the neighbours visited before the current cell
        let back: usize = if dirx == 1 { 4 } else { 0 };
        let up: usize = if diry == 1 { 5 } else { 1 };
        let diagonal = |link: usize| if diry == 1 { link + 4 } else { link };
        let up_back = diagonal(if linkdir == 1 { 3 } else { 2 });
        let up_ahead = diagonal(if linkdir == 1 { 2 } else { 3 });

        let options = self.options;

        for i in 0..rect.height {
            let y = seed.y + i as i32 * diry;
            for j in 0..rect.width {
                let x = seed.x + j as i32 * dirx;

                let mut candidates = [false; 8];
                if j > 0 {
                    candidates[back] = true;
                }
                if i > 0 {
                    candidates[up] = true;
                    if j > 0 {
                        candidates[up_back] = true;
                    }
                    if j + 1 < rect.width {
                        candidates[up_ahead] = true;
                    }
                }

                let mut link_costs = [0u32; 8];
                let mut pixel_costs = [0u32; 8];
                let mut cum_costs = [0u32; 8];
                let mut best: Option<usize> = None;

                for k in (0..8).filter(|&k| candidates[k]) {
                    let (dx, dy) = MOVES[k];
                    let neighbor = rect.index_of(Point::new(x + dx, y + dy));

                    link_costs[k] = link_cost(field, x, y, k, &options)?;
                    pixel_costs[k] = self.scratch[neighbor].cost;
                    cum_costs[k] = pixel_costs[k].saturating_add(link_costs[k]);

                    if best.map_or(true, |b| cum_costs[k] < cum_costs[b]) {
                        best = Some(k);
                    }
                }

                let cell = rect.index_of(Point::new(x, y));
                let Some(link) = best else {
                    self.scratch[cell] = DpCell { cost: 0, link: SEED };
                    continue;
                };

                self.scratch[cell] = DpCell {
                    cost: cum_costs[link],
                    link: link as u8,
                };

                // Reroute neighbours that get cheaper through this cell
                for k in (0..8).filter(|&k| candidates[k] && k != link) {
                    let new_cost = link_costs[k].saturating_add(cum_costs[link]);
                    if pixel_costs[k] > new_cost {
                        let (dx, dy) = MOVES[k];
                        let neighbor = rect.index_of(Point::new(x + dx, y + dy));
                        self.scratch[neighbor] = DpCell {
                            cost: new_cost,
                            link: opposite(k),
                        };
                    }
                }
            }
        }

        Ok(())
    }

    fn trace_back(&self, rect: Rect, start: Point, end: Point) -> Path {
        let mut points = Vec::new();
        let mut p = end;

        loop {
            points.push(p);
            let cell = self.scratch[rect.index_of(p)];
            if cell.link == SEED {
                break;
            }

            let step = MOVES.get(cell.link as usize).copied();
            let next = step.map(|(dx, dy)| Point::new(p.x + dx, p.y + dy));
            match next {
                Some(next) if rect.contains(next) && points.len() <= self.scratch.len() => p = next,
                _ => {
                    warn!(?start, ?end, at = ?p, "broken back link chain, using a straight line");
                    return Path::straight(start, end);
                }
            }
        }

        let cost = self.scratch[rect.index_of(end)].cost;
        points.reverse();
        Path {
            points,
            cost,
            kind: PathKind::Optimal,
        }
    }
}
