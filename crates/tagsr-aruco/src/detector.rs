//! Full-image marker detector.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tagsr_core::GrayImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    decode_marker_in_quad, find_marker_quads, DecodeConfig, Dictionary, MarkerDetection, Matcher,
    QuadSearchParams,
};

/// Detector parameters. Every field has a default, so partial JSON objects
/// are accepted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArucoDetectorParams {
    /// Hamming budget for code matching. Defaults to the dictionary's
    /// `max_correction_bits`.
    pub max_hamming: Option<u8>,
    pub decode: DecodeConfig,
    pub quads: QuadSearchParams,
}

/// ArUco detector for grayscale images.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    matcher: Matcher,
    params: ArucoDetectorParams,
}

impl ArucoDetector {
    pub fn new(dict: Dictionary, params: ArucoDetectorParams) -> Self {
        let max_hamming = params.max_hamming.unwrap_or(dict.max_correction_bits);
        Self {
            matcher: Matcher::new(dict, max_hamming),
            params,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        self.matcher.dictionary()
    }

    pub fn params(&self) -> &ArucoDetectorParams {
        &self.params
    }

    /// Detect all markers, at most one detection per id (best score wins).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Vec<MarkerDetection> {
        let quads = find_marker_quads(image, &self.params.quads);
        let dets: Vec<MarkerDetection> = quads
            .iter()
            .filter_map(|q| decode_marker_in_quad(image, q, &self.params.decode, &self.matcher))
            .collect();
        dedup_by_id_keep_best(dets)
    }

    /// Detected marker ids, sorted ascending.
    pub fn detect_ids(&self, image: &GrayImageView<'_>) -> Vec<u32> {
        let mut ids: Vec<u32> = self.detect(image).iter().map(|d| d.id).collect();
        ids.sort_unstable();
        ids
    }
}

fn dedup_by_id_keep_best(dets: Vec<MarkerDetection>) -> Vec<MarkerDetection> {
    let mut best: HashMap<u32, MarkerDetection> = HashMap::new();
    for d in dets {
        match best.get(&d.id) {
            Some(prev) if prev.score >= d.score => {}
            _ => {
                best.insert(d.id, d);
            }
        }
    }
    let mut out: Vec<MarkerDetection> = best.into_values().collect();
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out
}
