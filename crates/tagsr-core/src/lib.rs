//! Core types and utilities shared by the `tagsr` crates.
//!
//! This crate is small and purely geometric. It does *not*
//! depend on any image codec; callers adapt their rasters into
//! [`GrayImageView`] before handing them to the marker detector.

mod homography;
mod image;
mod logger;
mod quad;

pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_mean_3x3, GrayImage, GrayImageView};
pub use quad::{is_convex_quad, quad_area, quad_side_lengths, Quad};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{default_directives, init_with_level};
