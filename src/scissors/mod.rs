//! Intelligent scissors: edge-following boundary tracing.
//!
//! - **cost_map**: lazily computed, tiled gradient strength and direction
//! - **path_finder**: least-cost pixel paths between two points
//! - **contour**: the chain of traced segments built click by click
//! - **session**: one editing session tying the above to an image
//! - **options**: tunables, serializable as JSON

pub mod contour;
pub mod cost_map;
pub mod options;
pub mod path_finder;
pub mod session;

pub use contour::{ContourBuilder, ContourEvent, ContourState, CurveSegment, Vertex};
pub use cost_map::{CostField, CostSample, GradientCostMap};
pub use options::{PathOptions, ScissorsOptions};
pub use path_finder::{link_cost, Path, PathFinder, PathKind};
pub use session::{settle_inside_ridge, trace_selection, ScissorsSession};
