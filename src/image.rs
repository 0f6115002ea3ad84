//! Read-only access to the pixels the scissors tool traces.
//!
//! Images follow the same layout as the filters: `(height, width, channels)`
//! with 1, 2, 3 or 4 channels of `u8`. Two and four channel images carry
//! alpha in their last channel.

use ndarray::{s, Array3, ArrayView3, Axis};

use crate::error::{Result, ScissorsError};

/// Pixel access needed by the cost map.
///
/// Implementors must be shareable across threads because cost tiles are
/// computed in parallel.
pub trait ImageSource: Sync {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn channels(&self) -> usize;
    fn has_alpha(&self) -> bool;

    /// Borrow the pixels of `x..x + width` by `y..y + height`.
    fn region(&self, x: usize, y: usize, width: usize, height: usize) -> Result<ArrayView3<'_, u8>>;
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn has_alpha(&self) -> bool {
        (**self).has_alpha()
    }

    fn region(&self, x: usize, y: usize, width: usize, height: usize) -> Result<ArrayView3<'_, u8>> {
        (**self).region(x, y, width, height)
    }
}

/// An owned image buffer.
#[derive(Debug, Clone)]
pub struct RasterImage {
    data: Array3<u8>,
}

impl RasterImage {
    pub fn new(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// Wrap a flat, row-major pixel buffer.
    pub fn from_raw(width: usize, height: usize, channels: usize, pixels: Vec<u8>) -> Result<Self> {
        let data = Array3::from_shape_vec((height, width, channels), pixels)?;
        Ok(Self { data })
    }

    /// An image where every pixel has the value `color` (one entry per channel).
    pub fn filled(width: usize, height: usize, color: &[u8]) -> Self {
        let mut data = Array3::<u8>::zeros((height, width, color.len()));
        for mut pixel in data.lanes_mut(Axis(2)) {
            for (dst, &src) in pixel.iter_mut().zip(color) {
                *dst = src;
            }
        }
        Self { data }
    }

    /// Paint a rectangle, clipped to the image.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color: &[u8]) {
        let x_end = (x + width).min(self.width());
        let y_end = (y + height).min(self.height());
        if x >= x_end || y >= y_end {
            return;
        }

        let mut region = self.data.slice_mut(s![y..y_end, x..x_end, ..]);
        for mut pixel in region.lanes_mut(Axis(2)) {
            for (dst, &src) in pixel.iter_mut().zip(color) {
                *dst = src;
            }
        }
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array3<u8> {
        self.data
    }
}

impl ImageSource for RasterImage {
    fn width(&self) -> usize {
        self.data.dim().1
    }

    fn height(&self) -> usize {
        self.data.dim().0
    }

    fn channels(&self) -> usize {
        self.data.dim().2
    }

    fn has_alpha(&self) -> bool {
        matches!(self.channels(), 2 | 4)
    }

    fn region(&self, x: usize, y: usize, width: usize, height: usize) -> Result<ArrayView3<'_, u8>> {
        if x + width > self.width() || y + height > self.height() {
            return Err(ScissorsError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                image_width: self.width(),
                image_height: self.height(),
            });
        }
        Ok(self.data.slice(s![y..y + height, x..x + width, ..]))
    }
}

/// Borrowed pixels, e.g. a numpy array handed in from Python.
impl ImageSource for ArrayView3<'_, u8> {
    fn width(&self) -> usize {
        self.dim().1
    }

    fn height(&self) -> usize {
        self.dim().0
    }

    fn channels(&self) -> usize {
        self.dim().2
    }

    fn has_alpha(&self) -> bool {
        matches!(self.dim().2, 2 | 4)
    }

    fn region(&self, x: usize, y: usize, width: usize, height: usize) -> Result<ArrayView3<'_, u8>> {
        let (image_height, image_width, _) = self.dim();
        if x + width > image_width || y + height > image_height {
            return Err(ScissorsError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                image_width,
                image_height,
            });
        }
        Ok(self.slice(s![y..y + height, x..x + width, ..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips() {
        let mut image = RasterImage::filled(10, 8, &[0, 0, 0]);
        image.fill_rect(6, 5, 10, 10, &[255, 128, 0]);

        let view = image.view();
        assert_eq!(view[[5, 6, 0]], 255);
        assert_eq!(view[[7, 9, 1]], 128);
        assert_eq!(view[[4, 6, 0]], 0);
        assert_eq!(view[[5, 5, 0]], 0);
    }

    #[test]
    fn test_region_bounds() {
        let image = RasterImage::filled(10, 8, &[7]);
        let region = image.region(2, 3, 4, 5).expect("region inside the image");
        assert_eq!(region.dim(), (5, 4, 1));
        assert!(image.region(8, 0, 4, 1).is_err());
    }

    #[test]
    fn test_alpha_detection() {
        assert!(RasterImage::filled(2, 2, &[0, 0, 0, 255]).has_alpha());
        assert!(!RasterImage::filled(2, 2, &[0, 0, 0]).has_alpha());
    }

    #[test]
    fn test_view_as_source() {
        let image = RasterImage::filled(6, 4, &[1, 2, 3, 4]);
        let view = image.view();
        assert_eq!(ImageSource::width(&view), 6);
        assert!(ImageSource::has_alpha(&view));
        assert_eq!(view.region(1, 1, 5, 3).unwrap()[[2, 4, 3]], 4);
        assert!(view.region(0, 0, 7, 1).is_err());
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(RasterImage::from_raw(4, 4, 3, vec![0; 10]).is_err());
    }
}
