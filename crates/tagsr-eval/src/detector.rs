//! Detection seam between the evaluation pipeline and a marker detector.

use image::GrayImage;
use serde::Serialize;
use tagsr_aruco::ArucoDetector;
use tagsr_core::GrayImageView;

/// Anything that reports the marker ids visible in a grayscale image.
pub trait MarkerDetector {
    fn detect(&self, image: &GrayImage) -> Vec<u32>;
}

/// Borrow an `image` buffer as a core view.
pub fn gray_view(image: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: image.width() as usize,
        height: image.height() as usize,
        data: image.as_raw(),
    }
}

impl MarkerDetector for ArucoDetector {
    fn detect(&self, image: &GrayImage) -> Vec<u32> {
        self.detect_ids(&gray_view(image))
    }
}

impl<D: MarkerDetector + ?Sized> MarkerDetector for &D {
    fn detect(&self, image: &GrayImage) -> Vec<u32> {
        (**self).detect(image)
    }
}

/// Outcome of one detector call on one variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// Exactly one marker, with the expected id when verification is on.
    Detected { id: u32 },
    NoMarker,
    Multiple { count: usize },
    WrongId { expected: u32, found: u32 },
}

impl DetectionOutcome {
    /// Classify detector output. `expected` is `Some` only when identity
    /// verification is enabled.
    pub fn classify(ids: &[u32], expected: Option<u32>) -> Self {
        match (ids, expected) {
            ([], _) => Self::NoMarker,
            ([id], Some(expected)) if *id != expected => Self::WrongId {
                expected,
                found: *id,
            },
            ([id], _) => Self::Detected { id: *id },
            (many, _) => Self::Multiple { count: many.len() },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }
}
