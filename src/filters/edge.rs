//! Edge filters feeding the scissors cost map: noise suppression and
//! per-channel Sobel derivatives.
//!
//! ## Supported Formats
//!
//! Both filters accept images with 1, 2, 3 or 4 channels as
//! `(height, width, channels)` u8 arrays. Every channel, alpha included,
//! takes part: a transparent/opaque boundary is an edge like any other.

use ndarray::{Array2, Array3, ArrayView3};

/// Noise suppression kernel. Weights sum to 32.
pub const BLUR_32: [[i32; 3]; 3] = [[1, 1, 1], [1, 24, 1], [1, 1, 1]];

/// Horizontal derivative (left minus right).
pub const HORZ_DERIV: [[i32; 3]; 3] = [[1, 0, -1], [2, 0, -2], [1, 0, -1]];

/// Vertical derivative (top minus bottom).
pub const VERT_DERIV: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

/// Sum of the positive derivative weights; dividing by it maps a derivative
/// back to intensity units.
const DERIV_WEIGHT: i32 = 4;

/// Largest derivative magnitude kept per axis.
pub const MAX_DERIVATIVE: i32 = 127;

// ============================================================================
// Smoothing
// ============================================================================

/// Smooth every channel with [`BLUR_32`].
///
/// Pixels outside the buffer are replaced by the nearest edge pixel, so the
/// output has the same dimensions as the input.
pub fn smooth_u8(input: ArrayView3<u8>) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    let mut output = Array3::<u8>::zeros((height, width, channels));

    if width == 0 || height == 0 {
        return output;
    }

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0i32;
                for (ky, row) in BLUR_32.iter().enumerate() {
                    let py = (y as isize + ky as isize - 1).clamp(0, height as isize - 1) as usize;
                    for (kx, &weight) in row.iter().enumerate() {
                        let px = (x as isize + kx as isize - 1).clamp(0, width as isize - 1) as usize;
                        sum += input[[py, px, c]] as i32 * weight;
                    }
                }
                output[[y, x, c]] = ((sum + 16) / 32).min(255) as u8;
            }
        }
    }

    output
}

// ============================================================================
// Derivatives
// ============================================================================

/// Horizontal and vertical derivatives of the strongest channel.
///
/// For each pixel the channel with the largest absolute horizontal response
/// supplies the horizontal derivative, and likewise for the vertical one
/// (ties keep the lower channel). Responses are normalized by the kernel
/// weight and clamped to `±MAX_DERIVATIVE`. Pixels without a full 3x3
/// neighbourhood in the buffer are 0.
///
/// # Returns
/// `(horizontal, vertical)`, each shaped `(height, width)`.
pub fn max_channel_derivatives(input: ArrayView3<u8>) -> (Array2<i32>, Array2<i32>) {
    let (height, width, channels) = input.dim();
    let mut horizontal = Array2::<i32>::zeros((height, width));
    let mut vertical = Array2::<i32>::zeros((height, width));

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let mut hmax = 0i32;
            let mut vmax = 0i32;

            for c in 0..channels {
                let mut gx = 0i32;
                let mut gy = 0i32;

                for ky in 0..3 {
                    for kx in 0..3 {
                        let value = input[[y + ky - 1, x + kx - 1, c]] as i32;
                        gx += value * HORZ_DERIV[ky][kx];
                        gy += value * VERT_DERIV[ky][kx];
                    }
                }

                let gx = (gx / DERIV_WEIGHT).clamp(-MAX_DERIVATIVE, MAX_DERIVATIVE);
                let gy = (gy / DERIV_WEIGHT).clamp(-MAX_DERIVATIVE, MAX_DERIVATIVE);

                if c == 0 || gx.abs() > hmax.abs() {
                    hmax = gx;
                }
                if c == 0 || gy.abs() > vmax.abs() {
                    vmax = gy;
                }
            }

            horizontal[[y, x]] = hmax;
            vertical[[y, x]] = vmax;
        }
    }

    (horizontal, vertical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_step(width: usize, height: usize, split: usize) -> Array3<u8> {
        let mut img = Array3::<u8>::zeros((height, width, 3));
        for y in 0..height {
            for x in split..width {
                for c in 0..3 {
                    img[[y, x, c]] = 255;
                }
            }
        }
        img
    }

    #[test]
    fn test_smooth_flat_is_identity() {
        let img = Array3::<u8>::from_elem((4, 5, 2), 90);
        let result = smooth_u8(img.view());
        assert!(result.iter().all(|&v| v == 90));
    }

    #[test]
    fn test_smooth_softens_step() {
        let img = vertical_step(8, 5, 4);
        let result = smooth_u8(img.view());

        // Outside pixel next to the step picks up 3/32 of the bright side
        assert_eq!(result[[2, 3, 0]], 24);
        assert_eq!(result[[2, 4, 0]], 231);
        assert_eq!(result[[2, 0, 0]], 0);
        assert_eq!(result[[2, 7, 0]], 255);
    }

    #[test]
    fn test_derivatives_detect_vertical_edge() {
        let img = vertical_step(8, 5, 4);
        let (h, v) = max_channel_derivatives(img.view());

        // Dark on the left: left minus right is negative and saturates
        assert_eq!(h[[2, 3]], -MAX_DERIVATIVE);
        assert_eq!(h[[2, 4]], -MAX_DERIVATIVE);
        assert_eq!(v[[2, 3]], 0);
        assert_eq!(h[[2, 1]], 0);
        // Border pixels have no neighbourhood
        assert_eq!(h[[0, 3]], 0);
    }

    #[test]
    fn test_derivatives_pick_strongest_channel() {
        let mut img = Array3::<u8>::zeros((3, 3, 3));
        for y in 0..3 {
            img[[y, 2, 0]] = 40;
            img[[y, 0, 2]] = 200;
        }
        let (h, _) = max_channel_derivatives(img.view());

        // Channel 2 responds with +200, channel 0 with -40
        assert_eq!(h[[1, 1]], MAX_DERIVATIVE);
    }
}
