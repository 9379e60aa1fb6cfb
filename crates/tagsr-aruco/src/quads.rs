//! Marker candidate search: dark connected components reduced to quads.

use crate::threshold::otsu_threshold_from_histogram;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use tagsr_core::{is_convex_quad, quad_area, quad_side_lengths, GrayImageView, Quad};

/// Parameters for [`find_marker_quads`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadSearchParams {
    /// Minimum component area as a fraction of the image area.
    pub min_area_frac: f32,
    /// Minimum quad side length in pixels.
    pub min_side_px: f32,
    /// Maximum ratio between the longest and shortest quad side.
    pub max_side_ratio: f32,
    /// Minimum ratio of dark pixels to quad area.
    pub min_fill: f32,
    /// Keep at most this many candidates (largest first).
    pub max_candidates: usize,
}

impl Default for QuadSearchParams {
    fn default() -> Self {
        Self {
            min_area_frac: 0.002,
            min_side_px: 12.0,
            max_side_ratio: 2.5,
            min_fill: 0.2,
            max_candidates: 16,
        }
    }
}

/// Find marker-shaped quads in `image`.
///
/// The image is binarized with a global Otsu threshold; every 8-connected
/// dark component large enough to hold a marker is reduced to four corners
/// (two farthest-apart pixels, then the farthest pixel on each side of their
/// diagonal). Corners are returned clockwise starting near the image
/// top-left.
pub fn find_marker_quads(image: &GrayImageView<'_>, params: &QuadSearchParams) -> Vec<Quad> {
    if image.is_empty() {
        return Vec::new();
    }

    let mut hist = [0u32; 256];
    for &v in image.data {
        hist[v as usize] += 1;
    }
    let thr = otsu_threshold_from_histogram(&hist);
    let dark: Vec<bool> = image.data.iter().map(|&v| v < thr).collect();

    let min_area = (params.min_area_frac * (image.width * image.height) as f32)
        .max(params.min_side_px * params.min_side_px * params.min_fill);

    let mut quads: Vec<(usize, Quad)> = dark_components(&dark, image.width, image.height)
        .into_iter()
        .filter(|c| c.len() as f32 >= min_area)
        .filter_map(|c| {
            let quad = component_quad(&c)?;
            accept_quad(&quad, c.len(), params).then_some((c.len(), quad))
        })
        .collect();

    quads.sort_by(|a, b| b.0.cmp(&a.0));
    quads.truncate(params.max_candidates);
    log::debug!("quad search: threshold={thr}, candidates={}", quads.len());
    quads.into_iter().map(|(_, q)| q).collect()
}

fn accept_quad(quad: &Quad, pixels: usize, params: &QuadSearchParams) -> bool {
    if !is_convex_quad(quad) {
        return false;
    }
    let sides = quad_side_lengths(quad);
    let shortest = sides.iter().copied().fold(f32::INFINITY, f32::min);
    let longest = sides.iter().copied().fold(0.0f32, f32::max);
    if shortest < params.min_side_px || longest > params.max_side_ratio * shortest {
        return false;
    }
    let area = quad_area(quad).abs();
    area > 0.0 && pixels as f32 / area >= params.min_fill
}

/// 8-connected labelling of `mask`, returning the pixel list of each component.
fn dark_components(mask: &[bool], width: usize, height: usize) -> Vec<Vec<(u32, u32)>> {
    let mut visited = vec![false; mask.len()];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut pixels = Vec::new();

        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            pixels.push((x as u32, y as u32));

            let x0 = x.saturating_sub(1);
            let y0 = y.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);
            let y1 = (y + 1).min(height - 1);
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let n = ny * width + nx;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        out.push(pixels);
    }

    out
}

fn component_quad(pixels: &[(u32, u32)]) -> Option<Quad> {
    if pixels.len() < 4 {
        return None;
    }
    let pts: Vec<Point2<f32>> = pixels
        .iter()
        .map(|&(x, y)| Point2::new(x as f32 + 0.5, y as f32 + 0.5))
        .collect();

    let n = pts.len() as f32;
    let centroid = Point2::new(
        pts.iter().map(|p| p.x).sum::<f32>() / n,
        pts.iter().map(|p| p.y).sum::<f32>() / n,
    );

    let farthest_from = |origin: Point2<f32>| -> Point2<f32> {
        pts.iter()
            .copied()
            .max_by(|a, b| {
                (a - origin)
                    .norm_squared()
                    .total_cmp(&(b - origin).norm_squared())
            })
            .unwrap_or(origin)
    };

    let c0 = farthest_from(centroid);
    let c2 = farthest_from(c0);
    let diag = c2 - c0;
    if diag.norm_squared() < 1.0 {
        return None;
    }

    let cross = |p: &Point2<f32>| diag.x * (p.y - c0.y) - diag.y * (p.x - c0.x);
    let c1 = pts.iter().copied().max_by(|a, b| cross(a).total_cmp(&cross(b)))?;
    let c3 = pts.iter().copied().min_by(|a, b| cross(a).total_cmp(&cross(b)))?;
    if cross(&c1) <= 0.0 || cross(&c3) >= 0.0 {
        return None;
    }

    // Push corners half a pixel (diagonally) outwards so the quad covers the
    // pixel extents rather than the pixel centers.
    let mut corners = [c0, c1, c2, c3].map(|c| {
        let d: Vector2<f32> = c - centroid;
        let len = d.norm();
        if len > 1e-6 {
            c + d * (std::f32::consts::FRAC_1_SQRT_2 / len)
        } else {
            c
        }
    });

    // Clockwise in image coordinates (y down) == increasing atan2.
    corners.sort_by(|a, b| {
        let ta = (a.y - centroid.y).atan2(a.x - centroid.x);
        let tb = (b.y - centroid.y).atan2(b.x - centroid.x);
        ta.total_cmp(&tb)
    });
    let first = corners
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.x + a.y).total_cmp(&(b.x + b.y)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    corners.rotate_left(first);

    Some(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{render_marker, test_dictionary};
    use tagsr_core::GrayImage;

    #[test]
    fn finds_single_marker_quad() {
        let dict = test_dictionary();
        let img = render_marker(dict.codes[0], 4, 1, 12, 20);
        let quads = find_marker_quads(&img.view(), &QuadSearchParams::default());
        assert!(!quads.is_empty());

        let q = quads[0];
        // marker spans 20..92 in both axes
        assert!((q[0].x - 20.0).abs() < 1.5 && (q[0].y - 20.0).abs() < 1.5, "{q:?}");
        assert!((q[2].x - 92.0).abs() < 1.5 && (q[2].y - 92.0).abs() < 1.5, "{q:?}");
        assert!(quad_area(&q) > 0.0, "clockwise order expected");
    }

    #[test]
    fn blank_image_has_no_candidates() {
        let img = GrayImage::filled(64, 64, 200);
        assert!(find_marker_quads(&img.view(), &QuadSearchParams::default()).is_empty());
    }

    #[test]
    fn thin_line_is_rejected() {
        let mut img = GrayImage::filled(80, 80, 255);
        for x in 5..75 {
            for y in 38..41 {
                img.data[y * 80 + x] = 0;
            }
        }
        assert!(find_marker_quads(&img.view(), &QuadSearchParams::default()).is_empty());
    }
}
