//! Coverage masks and the boolean operations that merge them into a
//! persistent selection.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{try_alloc, Result, ScissorsError};
use crate::filters::core::{blur_mask_u8, radius_to_sigma};
use crate::geometry::Point;

/// Per-pixel coverage, 0 (unselected) to 255 (fully selected), shaped
/// `(height, width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    data: Array2<u8>,
}

impl SelectionMask {
    /// An empty mask.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let pixels = try_alloc("selection mask", width, height, 0u8)?;
        Self::from_raw(width, height, pixels)
    }

    /// Wrap a row-major coverage buffer.
    pub fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        Ok(Self {
            data: Array2::from_shape_vec((height, width), pixels)?,
        })
    }

    pub fn from_array(data: Array2<u8>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn view(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn into_array(self) -> Array2<u8> {
        self.data
    }

    /// Row-major coverage bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    /// Coverage at `(x, y)`; 0 outside the mask.
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 {
            return 0;
        }
        self.data.get((y as usize, x as usize)).copied().unwrap_or(0)
    }

    /// Set coverage at `(x, y)`. Positions outside the mask are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(pixel) = self.data.get_mut((y as usize, x as usize)) {
            *pixel = value;
        }
    }

    /// Set every listed pixel to `value`.
    pub fn stamp_points(&mut self, points: &[Point], value: u8) {
        for p in points {
            self.set(p.x, p.y, value);
        }
    }

    /// Number of pixels with any coverage.
    pub fn covered_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }

    pub fn coverage_sum(&self) -> u64 {
        self.data.iter().map(|&v| v as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Bounding box of covered pixels as `(x, y, width, height)`.
    pub fn bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let mut min_x = self.width();
        let mut min_y = self.height();
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for ((y, x), &v) in self.data.indexed_iter() {
            if v > 0 {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        any.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// A copy with edges softened over roughly `radius` pixels.
    pub fn feathered(&self, radius: f64) -> SelectionMask {
        let sigma = radius_to_sigma(radius as f32);
        Self::from_array(blur_mask_u8(&self.data, sigma))
    }
}

/// How a new mask merges into the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionOp {
    Add,
    Subtract,
    #[default]
    Replace,
    Intersect,
}

/// Receiver of finished masks.
pub trait SelectionCombiner {
    fn combine(
        &mut self,
        mask: &SelectionMask,
        op: SelectionOp,
        feather: bool,
        feather_radius: f64,
    ) -> Result<()>;
}

/// A persistent selection over one image.
#[derive(Debug, Clone)]
pub struct Selection {
    mask: SelectionMask,
}

impl Selection {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            mask: SelectionMask::new(width, height)?,
        })
    }

    pub fn mask(&self) -> &SelectionMask {
        &self.mask
    }

    pub fn clear(&mut self) {
        self.mask.data.fill(0);
    }
}

impl SelectionCombiner for Selection {
    fn combine(
        &mut self,
        mask: &SelectionMask,
        op: SelectionOp,
        feather: bool,
        feather_radius: f64,
    ) -> Result<()> {
        if mask.width() != self.mask.width() || mask.height() != self.mask.height() {
            return Err(ScissorsError::MaskSizeMismatch {
                mask_width: mask.width(),
                mask_height: mask.height(),
                width: self.mask.width(),
                height: self.mask.height(),
            });
        }

        let feathered;
        let incoming = if feather && feather_radius > 0.0 {
            feathered = mask.feathered(feather_radius);
            &feathered
        } else {
            mask
        };

        let current = &mut self.mask.data;
        match op {
            SelectionOp::Replace => current.assign(&incoming.data),
            SelectionOp::Add => {
                Zip::from(current).and(&incoming.data).for_each(|c, &m| *c = (*c).max(m))
            }
            SelectionOp::Subtract => Zip::from(current)
                .and(&incoming.data)
                .for_each(|c, &m| *c = c.saturating_sub(m)),
            SelectionOp::Intersect => {
                Zip::from(current).and(&incoming.data).for_each(|c, &m| *c = (*c).min(m))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(width: usize, height: usize, x0: usize, x1: usize, value: u8) -> SelectionMask {
        let mut mask = SelectionMask::new(width, height).unwrap();
        for y in 0..height {
            for x in x0..x1 {
                mask.set(x as i32, y as i32, value);
            }
        }
        mask
    }

    #[test]
    fn test_get_set_bounds() {
        let mut mask = SelectionMask::new(8, 6).unwrap();
        assert_eq!(mask.bounds(), None);

        mask.set(2, 1, 255);
        mask.set(5, 4, 10);
        mask.set(-1, 3, 255);
        mask.set(8, 0, 255);

        assert_eq!(mask.get(2, 1), 255);
        assert_eq!(mask.get(20, 1), 0);
        assert_eq!(mask.covered_count(), 2);
        assert_eq!(mask.coverage_sum(), 265);
        assert_eq!(mask.bounds(), Some((2, 1, 4, 4)));
    }

    #[test]
    fn test_stamp_points() {
        let mut mask = SelectionMask::new(4, 4).unwrap();
        mask.stamp_points(&[Point::new(0, 0), Point::new(3, 3), Point::new(4, 4)], 200);
        assert_eq!(mask.covered_count(), 2);
        assert_eq!(mask.get(3, 3), 200);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(SelectionMask::from_raw(3, 3, vec![0; 9]).is_ok());
        assert!(SelectionMask::from_raw(3, 3, vec![0; 8]).is_err());
    }

    #[test]
    fn test_combine_ops() {
        let left = block(10, 2, 0, 6, 255);
        let right = block(10, 2, 4, 10, 255);

        let mut selection = Selection::new(10, 2).unwrap();
        selection.combine(&left, SelectionOp::Replace, false, 0.0).unwrap();
        assert_eq!(selection.mask().covered_count(), 12);

        selection.combine(&right, SelectionOp::Add, false, 0.0).unwrap();
        assert_eq!(selection.mask().covered_count(), 20);

        selection.combine(&left, SelectionOp::Replace, false, 0.0).unwrap();
        selection.combine(&right, SelectionOp::Intersect, false, 0.0).unwrap();
        assert_eq!(selection.mask().bounds(), Some((4, 0, 2, 2)));

        selection.combine(&left, SelectionOp::Replace, false, 0.0).unwrap();
        selection.combine(&right, SelectionOp::Subtract, false, 0.0).unwrap();
        assert_eq!(selection.mask().bounds(), Some((0, 0, 4, 2)));
    }

    #[test]
    fn test_combine_rejects_size_mismatch() {
        let mut selection = Selection::new(10, 10).unwrap();
        let mask = SelectionMask::new(5, 5).unwrap();
        assert!(matches!(
            selection.combine(&mask, SelectionOp::Add, false, 0.0),
            Err(ScissorsError::MaskSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_feathered_combine_is_soft() {
        let mask = block(30, 5, 10, 20, 255);
        let mut selection = Selection::new(30, 5).unwrap();
        selection.combine(&mask, SelectionOp::Replace, true, 6.0).unwrap();

        let result = selection.mask();
        assert!(result.get(15, 2) > 200);
        assert!(result.get(10, 2) > 0 && result.get(10, 2) < 255);
        assert!(result.get(8, 2) > 0);
        assert_eq!(result.get(0, 2), 0);
    }

    #[test]
    fn test_op_serde_names() {
        assert_eq!(serde_json::to_string(&SelectionOp::Intersect).unwrap(), "\"intersect\"");
        let op: SelectionOp = serde_json::from_str("\"subtract\"").unwrap();
        assert_eq!(op, SelectionOp::Subtract);
    }
}
