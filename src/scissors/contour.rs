//! The chain of traced segments the user builds one click at a time.

use tracing::trace;

use super::cost_map::CostField;
use super::options::PathOptions;
use super::path_finder::{Path, PathFinder};
use crate::error::Result;
use crate::geometry::Point;

/// A user placed anchor point.
pub type Vertex = Point;

/// The traced path between two consecutive vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveSegment {
    pub v1: Vertex,
    pub v2: Vertex,
    /// Pixels from `v1` to `v2`, both included.
    pub path: Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourState {
    Empty,
    Building,
    Closed,
}

/// What a placement did to the contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourEvent {
    Started,
    Extended,
    Closed,
    Ignored,
}

/// Builds an open or closed contour of traced segments.
///
/// Segment `i` always runs from vertex `i` to vertex `i + 1`; once closed
/// the last segment runs from the last vertex back to the first.
#[derive(Debug)]
pub struct ContourBuilder {
    finder: PathFinder,
    close_radius: f64,
    vertices: Vec<Vertex>,
    segments: Vec<CurveSegment>,
    state: ContourState,
}

impl ContourBuilder {
    pub fn new(path_options: PathOptions, close_radius: f64) -> Self {
        Self {
            finder: PathFinder::new(path_options),
            close_radius,
            vertices: Vec::new(),
            segments: Vec::new(),
            state: ContourState::Empty,
        }
    }

    pub fn state(&self) -> ContourState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ContourState::Closed
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    pub fn close_radius(&self) -> f64 {
        self.close_radius
    }

    /// Start a new contour at `p`. Only valid while empty.
    pub fn place_first_vertex(&mut self, p: Point) -> ContourEvent {
        if self.state != ContourState::Empty {
            return ContourEvent::Ignored;
        }
        self.vertices.push(p);
        self.state = ContourState::Building;
        trace!(?p, "contour started");
        ContourEvent::Started
    }

    /// Add a vertex at `p`, or close the contour when `p` lands within the
    /// close radius of the first vertex.
    pub fn place_vertex<F: CostField + ?Sized>(&mut self, field: &mut F, p: Point) -> Result<ContourEvent> {
        match self.state {
            ContourState::Empty => Ok(self.place_first_vertex(p)),
            ContourState::Closed => Ok(ContourEvent::Ignored),
            ContourState::Building => {
                let first = self.vertices[0];
                if p.within(first, self.close_radius) {
                    return self.close(field);
                }

                let last = self.vertices[self.vertices.len() - 1];
                let segment = self.trace(field, last, p)?;
                self.vertices.push(p);
                self.segments.push(segment);
                trace!(?p, vertices = self.vertices.len(), "contour extended");
                Ok(ContourEvent::Extended)
            }
        }
    }

    /// Close the contour from the last vertex back to the first.
    ///
    /// Needs at least two vertices; otherwise nothing happens.
    pub fn close<F: CostField + ?Sized>(&mut self, field: &mut F) -> Result<ContourEvent> {
        if self.state != ContourState::Building || self.vertices.len() < 2 {
            return Ok(ContourEvent::Ignored);
        }

        let first = self.vertices[0];
        let last = self.vertices[self.vertices.len() - 1];
        let segment = self.trace(field, last, first)?;
        self.segments.push(segment);
        self.state = ContourState::Closed;
        trace!(vertices = self.vertices.len(), "contour closed");
        Ok(ContourEvent::Closed)
    }

    /// Move vertex `index` to `p` and retrace the segments touching it.
    ///
    /// Returns `false` for an unknown vertex.
    pub fn adjust_vertex<F: CostField + ?Sized>(
        &mut self,
        field: &mut F,
        index: usize,
        p: Point,
    ) -> Result<bool> {
        if index >= self.vertices.len() {
            return Ok(false);
        }
        self.vertices[index] = p;

        let incoming = match index {
            0 if self.is_closed() => Some(self.segments.len() - 1),
            0 => None,
            i => Some(i - 1),
        };
        for segment in incoming.into_iter().chain(Some(index)) {
            if segment < self.segments.len() {
                self.retrace(field, segment)?;
            }
        }

        trace!(index, ?p, "vertex moved");
        Ok(true)
    }

    /// Split segment `segment` at `p`, inserting a new vertex there.
    ///
    /// Returns `false` for an unknown segment.
    pub fn insert_vertex<F: CostField + ?Sized>(
        &mut self,
        field: &mut F,
        segment: usize,
        p: Point,
    ) -> Result<bool> {
        if segment >= self.segments.len() {
            return Ok(false);
        }

        let v1 = self.segments[segment].v1;
        let v2 = self.segments[segment].v2;
        let head = self.trace(field, v1, p)?;
        let tail = self.trace(field, p, v2)?;

        self.vertices.insert(segment + 1, p);
        self.segments[segment] = head;
        self.segments.insert(segment + 1, tail);

        trace!(segment, ?p, "vertex inserted");
        Ok(true)
    }

    /// Drop every vertex and segment.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.segments.clear();
        self.state = ContourState::Empty;
        trace!("contour reset");
    }

    /// The vertex nearest to `p` within `radius`.
    pub fn vertex_at(&self, p: Point, radius: f64) -> Option<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.within(p, radius))
            .min_by_key(|(_, v)| v.distance_squared(p))
            .map(|(i, _)| i)
    }

    /// The segment whose path passes nearest to `p` within `radius`.
    pub fn segment_at(&self, p: Point, radius: f64) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, segment)| {
                segment
                    .path
                    .points
                    .iter()
                    .map(|q| q.distance_squared(p))
                    .min()
                    .map(|d| (i, d))
            })
            .filter(|&(_, d)| (d as f64) <= radius * radius)
            .min_by_key(|&(_, d)| d)
            .map(|(i, _)| i)
    }

    /// All traced pixels in order, each shared vertex listed once.
    ///
    /// For a closed contour the first pixel is not repeated at the end.
    pub fn polyline(&self) -> Vec<Point> {
        let mut points: Vec<Point> = Vec::new();
        for segment in &self.segments {
            let skip = usize::from(!points.is_empty());
            points.extend(segment.path.points.iter().skip(skip));
        }
        if self.is_closed() && points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.is_empty() {
            points.extend(self.vertices.first());
        }
        points
    }

    fn retrace<F: CostField + ?Sized>(&mut self, field: &mut F, segment: usize) -> Result<()> {
        let v1 = self.vertices[segment];
        let v2 = self.vertices[(segment + 1) % self.vertices.len()];
        self.segments[segment] = self.trace(field, v1, v2)?;
        Ok(())
    }

    fn trace<F: CostField + ?Sized>(&mut self, field: &mut F, v1: Point, v2: Point) -> Result<CurveSegment> {
        let path = self.finder.find_path(field, v1, v2)?;
        Ok(CurveSegment { v1, v2, path })
    }
}
