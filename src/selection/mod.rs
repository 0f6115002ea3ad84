//! Selection masks.
//!
//! - **Scan conversion**: closed outlines (traced contours, polygons,
//!   rectangles, ellipses, bezier chains) to coverage masks
//! - **Masks**: coverage buffers and their combination into a persistent
//!   selection

pub mod mask;
pub mod scan_convert;

pub use mask::{Selection, SelectionCombiner, SelectionMask, SelectionOp};
pub use scan_convert::{rasterize, ScanConverter};
