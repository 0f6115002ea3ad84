//! Core utilities shared by the selection code.
//!
//! - Gaussian kernel generation
//! - Separable Gaussian blur of coverage masks (selection feathering)

use ndarray::{Array2, Axis};
use rayon::prelude::*;

/// Generate a 1D Gaussian kernel.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
///
/// # Returns
/// Normalized 1D kernel as Vec<f32>
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    // Kernel size = 6 sigma (covers 99.7% of distribution), ensure odd
    let kernel_size = ((sigma * 6.0).ceil() as usize) | 1;
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Standard deviation for a blur that fades out over `radius` pixels.
///
/// The tail of the Gaussian reaches 1/255 at `radius`.
pub fn radius_to_sigma(radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (radius * radius / (2.0 * 255f32.ln())).sqrt()
}

/// Apply a separable Gaussian blur to a u8 coverage mask.
///
/// Rows of both passes are processed in parallel. Edge pixels are
/// replicated beyond the mask border.
///
/// # Arguments
/// * `mask` - Coverage values shaped `(height, width)`
/// * `sigma` - Blur radius (standard deviation)
pub fn blur_mask_u8(mask: &Array2<u8>, sigma: f32) -> Array2<u8> {
    let (height, width) = mask.dim();
    if sigma <= 0.0 || width == 0 || height == 0 {
        return mask.clone();
    }

    let kernel = gaussian_kernel_1d(sigma);
    let half = kernel.len() / 2;

    let mut temp = Array2::<f32>::zeros((height, width));
    let mut result = Array2::<u8>::zeros((height, width));

    // Horizontal pass
    temp.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..width {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - half as isize)
                        .clamp(0, width as isize - 1) as usize;
                    sum += mask[[y, sx]] as f32 * kv;
                }
                row[x] = sum;
            }
        });

    // Vertical pass
    result
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..width {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - half as isize)
                        .clamp(0, height as isize - 1) as usize;
                    sum += temp[[sy, x]] * kv;
                }
                row[x] = sum.round().clamp(0.0, 255.0) as u8;
            }
        });

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized() {
        let kernel = gaussian_kernel_1d(2.0);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len() % 2, 1);
    }

    #[test]
    fn test_radius_to_sigma() {
        assert_eq!(radius_to_sigma(0.0), 0.0);
        let sigma = radius_to_sigma(10.0);
        assert!(sigma > 2.9 && sigma < 3.1);
    }

    #[test]
    fn test_blur_mask_softens_edge() {
        let mut mask = Array2::<u8>::zeros((20, 20));
        for y in 5..15 {
            for x in 5..15 {
                mask[[y, x]] = 255;
            }
        }

        let blurred = blur_mask_u8(&mask, 2.0);

        assert!(blurred[[10, 10]] > 200);
        assert!(blurred[[10, 5]] > 0 && blurred[[10, 5]] < 255);
        assert!(blurred[[10, 4]] > 0);
        assert_eq!(blurred[[0, 0]], 0);
    }

    #[test]
    fn test_blur_zero_sigma_is_copy() {
        let mask = Array2::<u8>::from_elem((3, 4), 77);
        assert_eq!(blur_mask_u8(&mask, 0.0), mask);
    }
}
