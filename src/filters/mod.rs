//! Low-level kernels used by the scissors pipeline.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type |
//! |--------|-------|------|
//! | Grayscale8 | (H, W, 1) | u8 |
//! | Grayscale + alpha | (H, W, 2) | u8 |
//! | RGB8 | (H, W, 3) | u8 |
//! | RGBA8 | (H, W, 4) | u8 |
//!
//! Masks are `(H, W)` u8 arrays.
//!
//! ## Modules
//!
//! - **edge**: noise suppression and per-channel derivatives for the cost map
//! - **core**: Gaussian kernels and mask blurring for feathered selections

pub mod core;
pub mod edge;
