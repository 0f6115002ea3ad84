//! Intelligent scissors selection.
//!
//! Traces object boundaries by following image edges between user placed
//! points, then turns the closed outline into a selection mask, with Python
//! bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Image Format
//! Images are `(height, width, channels)` u8 arrays:
//! - **Grayscale**: (height, width, 1)
//! - **Grayscale + alpha**: (height, width, 2)
//! - **RGB**: (height, width, 3)
//! - **RGBA**: (height, width, 4)
//!
//! Every channel, alpha included, contributes to edge detection.
//!
//! ## Pipeline
//! 1. [`scissors::GradientCostMap`] computes edge strength and direction in
//!    64x64 tiles the first time a region is touched.
//! 2. [`scissors::PathFinder`] finds the cheapest 8-connected path between
//!    two vertices, preferring strong, well aligned edges.
//! 3. [`scissors::ContourBuilder`] chains those paths into an open or closed
//!    contour; [`scissors::ScissorsSession`] drives it from clicks.
//! 4. [`selection::ScanConverter`] rasterizes the closed contour into a
//!    [`selection::SelectionMask`], optionally antialiased.
//!
//! ```
//! use scissors_select::geometry::Point;
//! use scissors_select::image::RasterImage;
//! use scissors_select::scissors::{ScissorsOptions, ScissorsSession};
//!
//! let mut image = RasterImage::filled(100, 100, &[0, 0, 0]);
//! image.fill_rect(30, 30, 40, 40, &[255, 255, 255]);
//!
//! let mut session = ScissorsSession::new(&image, ScissorsOptions::default())?;
//! for p in [(32, 32), (67, 32), (66, 66), (32, 67)] {
//!     session.click(Point::from(p))?;
//! }
//! session.close()?;
//! let mask = session.rasterize()?;
//! assert!(mask.covered_count() > 1500);
//! # Ok::<(), scissors_select::error::ScissorsError>(())
//! ```

pub mod error;
pub mod filters;
pub mod geometry;
pub mod image;
pub mod scissors;
pub mod selection;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Result, ScissorsError};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::ScissorsError;
    use crate::geometry::Point;
    use crate::scissors::{trace_selection, GradientCostMap, PathFinder, ScissorsOptions};
    use crate::selection::{self, ScanConverter};

    impl From<ScissorsError> for PyErr {
        fn from(err: ScissorsError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    fn parse_options(options_json: Option<&str>) -> crate::Result<ScissorsOptions> {
        match options_json {
            Some(json) => ScissorsOptions::from_json(json),
            None => Ok(ScissorsOptions::default()),
        }
    }

    // ========================================================================
    // Intelligent Scissors
    // ========================================================================

    /// Trace a closed outline through `points` and return its selection mask.
    ///
    /// # Arguments
    /// * `image` - (height, width, channels) u8 image, 1-4 channels
    /// * `points` - Clicked (x, y) positions in order; the outline is closed
    ///   back to the first one
    /// * `options_json` - Optional JSON object overriding default options
    ///
    /// # Returns
    /// (height, width) u8 coverage mask
    #[pyfunction]
    #[pyo3(name = "scissors_select", signature = (image, points, options_json=None))]
    pub fn select_outline<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        points: Vec<(i32, i32)>,
        options_json: Option<&str>,
    ) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let options = parse_options(options_json)?;
        let clicks: Vec<Point> = points.into_iter().map(Point::from).collect();
        let mask = trace_selection(image.as_array(), &clicks, options)?;
        Ok(mask.into_array().into_pyarray(py))
    }

    /// Cheapest edge-following path between two pixels.
    ///
    /// # Returns
    /// List of (x, y) pixels from `start` to `end`, both included
    #[pyfunction]
    #[pyo3(signature = (image, start, end, options_json=None))]
    pub fn scissors_find_path(
        image: PyReadonlyArray3<'_, u8>,
        start: (i32, i32),
        end: (i32, i32),
        options_json: Option<&str>,
    ) -> PyResult<Vec<(i32, i32)>> {
        let options = parse_options(options_json)?;
        let mut map = GradientCostMap::new(image.as_array());
        let mut finder = PathFinder::new(options.path);
        let path = finder.find_path(&mut map, Point::from(start), Point::from(end))?;
        Ok(path.points.into_iter().map(|p| (p.x, p.y)).collect())
    }

    /// Rasterize a closed polygon into a (height, width) coverage mask.
    #[pyfunction]
    #[pyo3(signature = (points, width, height, antialias=true, supersample=3))]
    pub fn rasterize_polygon<'py>(
        py: Python<'py>,
        points: Vec<(f64, f64)>,
        width: usize,
        height: usize,
        antialias: bool,
        supersample: u32,
    ) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let mask = selection::rasterize(&points, width, height, antialias, supersample)?;
        Ok(mask.into_array().into_pyarray(py))
    }

    /// Rasterize an axis aligned ellipse into a (height, width) coverage mask.
    #[pyfunction]
    #[pyo3(signature = (cx, cy, rx, ry, width, height, antialias=true, supersample=3))]
    #[allow(clippy::too_many_arguments)]
    pub fn rasterize_ellipse<'py>(
        py: Python<'py>,
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        width: usize,
        height: usize,
        antialias: bool,
        supersample: u32,
    ) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let mask = ScanConverter::new()
            .add_ellipse(cx, cy, rx, ry)
            .render(width, height, antialias, supersample)?;
        Ok(mask.into_array().into_pyarray(py))
    }

    /// Intelligent scissors extension module
    #[pymodule]
    pub fn scissors_select(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Boundary tracing
        m.add_function(wrap_pyfunction!(select_outline, m)?)?;
        m.add_function(wrap_pyfunction!(scissors_find_path, m)?)?;

        // Scan conversion
        m.add_function(wrap_pyfunction!(rasterize_polygon, m)?)?;
        m.add_function(wrap_pyfunction!(rasterize_ellipse, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::scissors_select;
