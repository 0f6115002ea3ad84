//! WebAssembly exports for the scissors tool.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Buffers
//!
//! - Images are flat, row-major u8 arrays of `width * height * channels`
//!   bytes with 1-4 channels.
//! - Points are flat `[x0, y0, x1, y1, ...]` arrays.
//! - Masks come back as flat `width * height` coverage bytes.

use ndarray::ArrayView3;
use wasm_bindgen::prelude::*;

use crate::error::ScissorsError;
use crate::geometry::Point;
use crate::scissors::{trace_selection, GradientCostMap, PathFinder, ScissorsOptions};
use crate::selection::{self, ScanConverter};

fn to_js(err: ScissorsError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_options(options_json: Option<String>) -> Result<ScissorsOptions, JsValue> {
    match options_json {
        Some(json) => ScissorsOptions::from_json(&json).map_err(to_js),
        None => Ok(ScissorsOptions::default()),
    }
}

fn image_view(data: &[u8], width: usize, height: usize, channels: usize) -> Result<ArrayView3<'_, u8>, JsValue> {
    ArrayView3::from_shape((height, width, channels), data).map_err(|e| to_js(e.into()))
}

// ============================================================================
// Intelligent Scissors
// ============================================================================

/// Trace a closed outline through the clicked points and return its mask.
///
/// # Arguments
/// * `data` - Flat image bytes (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - Bytes per pixel, 1-4
/// * `points` - Flat clicked positions `[x0, y0, x1, y1, ...]`
/// * `options_json` - Optional JSON object overriding default options
///
/// # Returns
/// Flat coverage mask (length = width * height)
#[wasm_bindgen]
pub fn scissors_select_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    points: &[i32],
    options_json: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    let image = image_view(data, width, height, channels)?;
    let options = parse_options(options_json)?;
    let clicks: Vec<Point> = points
        .chunks_exact(2)
        .map(|xy| Point::new(xy[0], xy[1]))
        .collect();

    let mask = trace_selection(image, &clicks, options).map_err(to_js)?;
    Ok(mask.into_raw())
}

/// Cheapest edge-following path between two pixels.
///
/// # Returns
/// Flat path pixels `[x0, y0, x1, y1, ...]` from start to end
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn scissors_find_path_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
) -> Result<Vec<i32>, JsValue> {
    let image = image_view(data, width, height, channels)?;
    let mut map = GradientCostMap::new(image);
    let mut finder = PathFinder::default();

    let path = finder
        .find_path(&mut map, Point::new(start_x, start_y), Point::new(end_x, end_y))
        .map_err(to_js)?;
    Ok(path.points.iter().flat_map(|p| [p.x, p.y]).collect())
}

// ============================================================================
// Scan Conversion
// ============================================================================

/// Rasterize a closed polygon given as flat `[x0, y0, x1, y1, ...]`.
#[wasm_bindgen]
pub fn rasterize_polygon_wasm(
    points: &[f64],
    width: usize,
    height: usize,
    antialias: bool,
    supersample: u32,
) -> Result<Vec<u8>, JsValue> {
    let outline: Vec<(f64, f64)> = points.chunks_exact(2).map(|xy| (xy[0], xy[1])).collect();
    let mask = selection::rasterize(&outline, width, height, antialias, supersample).map_err(to_js)?;
    Ok(mask.into_raw())
}

/// Rasterize an axis aligned ellipse.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn rasterize_ellipse_wasm(
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    width: usize,
    height: usize,
    antialias: bool,
    supersample: u32,
) -> Result<Vec<u8>, JsValue> {
    let mask = ScanConverter::new()
        .add_ellipse(cx, cy, rx, ry)
        .render(width, height, antialias, supersample)
        .map_err(to_js)?;
    Ok(mask.into_raw())
}
