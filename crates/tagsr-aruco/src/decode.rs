//! Marker decoding from image quads.

use crate::threshold::otsu_threshold_from_samples;
use crate::Matcher;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tagsr_core::{homography_from_4pt, sample_mean_3x3, GrayImageView, Homography, Quad};

/// Decoder configuration for reading marker bits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Marker border width in cells (OpenCV uses 1).
    pub border_bits: usize,
    /// Fraction of the quad side ignored near its edges.
    pub inset_frac: f32,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Minimum spread between darkest and brightest bit sample.
    pub min_contrast: u8,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.03,
            min_border_score: 0.85,
            min_contrast: 30,
        }
    }
}

/// One decoded marker detection.
#[derive(Clone, Debug, Serialize)]
pub struct MarkerDetection {
    pub id: u32,
    pub rotation: u8,
    pub hamming: u8,
    pub score: f32,
    pub border_score: f32,
    /// Observed inner bits (row-major, black=1).
    pub code: u64,
    /// Whether the decoder inverted polarity to maximize `border_score`.
    pub inverted: bool,
    /// Quad corners in image coordinates (TL, TR, BR, BL).
    pub corners_img: [[f32; 2]; 4],
}

#[derive(Clone, Copy, Debug)]
struct MarkerObservation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

/// Canonical marker square: `[0, 1] × [0, 1]`.
const UNIT_SQUARE: Quad = [
    Point2::new(0.0, 0.0),
    Point2::new(1.0, 0.0),
    Point2::new(1.0, 1.0),
    Point2::new(0.0, 1.0),
];

const THRESH_SUBDIV: usize = 3;

/// Decode a single marker occupying `quad` in `image`.
///
/// Returns `None` when the quad is degenerate, leaves the image, fails the
/// border/contrast checks, or the code has no dictionary match.
pub fn decode_marker_in_quad(
    image: &GrayImageView<'_>,
    quad: &Quad,
    cfg: &DecodeConfig,
    matcher: &Matcher,
) -> Option<MarkerDetection> {
    let bits = matcher.dictionary().marker_size;
    let cells = bits + 2 * cfg.border_bits;
    let h = homography_from_4pt(&UNIT_SQUARE, quad)?;

    let inset = cfg.inset_frac.clamp(0.0, 0.25);
    let side = 1.0 - 2.0 * inset;

    let samples = sample_grid(image, &h, inset, side, cells)?;
    let thr_grid = cells * THRESH_SUBDIV;
    let thr_samples = sample_grid(image, &h, inset, side, thr_grid).unwrap_or_default();

    let obs = decode_samples(&samples, &thr_samples, cells, bits, cfg)?;
    let m = matcher.match_code(obs.code)?;

    let bit_count = matcher.dictionary().bit_count().max(1) as f32;
    let ham_pen = 1.0 - (m.hamming as f32 / bit_count);
    let score = (obs.border_score * ham_pen).clamp(0.0, 1.0);

    Some(MarkerDetection {
        id: m.id,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score: obs.border_score,
        code: obs.code,
        inverted: obs.inverted,
        corners_img: quad.map(|p| [p.x, p.y]),
    })
}

/// Sample an `n × n` grid of cell centers (row-major) through `h`.
fn sample_grid(
    image: &GrayImageView<'_>,
    h: &Homography,
    start: f32,
    side: f32,
    n: usize,
) -> Option<Vec<u8>> {
    let step = side / n as f32;
    let mut out = Vec::with_capacity(n * n);
    for cy in 0..n {
        for cx in 0..n {
            let p = Point2::new(
                start + (cx as f32 + 0.5) * step,
                start + (cy as f32 + 0.5) * step,
            );
            let q = h.apply(p);
            out.push(sample_mean_3x3(image, q.x, q.y)?);
        }
    }
    Some(out)
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    cfg: &DecodeConfig,
) -> Option<MarkerObservation> {
    if samples.len() != cells * cells {
        return None;
    }

    let lo = samples.iter().copied().min()?;
    let hi = samples.iter().copied().max()?;
    if hi - lo < cfg.min_contrast {
        return None;
    }

    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)
    } else {
        otsu_threshold_from_samples(thr_samples)
    };

    let border = cfg.border_bits;
    let use_border = border > 0;
    let mut best: Option<MarkerObservation> = None;

    for inverted in [false, true] {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code: u64 = 0;

        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] < thr) != inverted;

                let is_border = use_border
                    && (cx < border || cy < border || cx >= bits + border || cy >= bits + border);
                if is_border {
                    border_total += 1;
                    if is_black {
                        border_ok += 1;
                    }
                } else if is_black {
                    let idx = (cy - border) * bits + (cx - border);
                    code |= 1u64 << idx;
                }
            }
        }

        let border_score = if use_border {
            border_ok as f32 / border_total.max(1) as f32
        } else {
            1.0
        };
        if border_score < cfg.min_border_score {
            continue;
        }

        if best.map(|b| border_score > b.border_score).unwrap_or(true) {
            best = Some(MarkerObservation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}
