//! ArUco marker dictionaries, quad search and decoding utilities.
//!
//! This crate focuses on:
//! - dictionaries loaded from JSON at runtime,
//! - matching observed marker codes against those dictionaries,
//! - finding marker-shaped dark quads in a grayscale image,
//! - decoding markers from image quads.
//!
//! The detector is tuned for the evaluation setting: one isolated tag per
//! image on a light background.

mod decode;
mod detector;
mod dictionary;
mod matcher;
mod quads;
mod threshold;

pub use decode::{decode_marker_in_quad, DecodeConfig, MarkerDetection};
pub use detector::{ArucoDetector, ArucoDetectorParams};
pub use dictionary::{Dictionary, DictionaryError};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use quads::{find_marker_quads, QuadSearchParams};

#[cfg(test)]
pub(crate) mod test_utils;
