//! Quadrilateral helpers for marker candidates.

use nalgebra::Point2;

/// Image-space quad, corners ordered TL, TR, BR, BL.
pub type Quad = [Point2<f32>; 4];

/// Signed shoelace area; positive for clockwise order in image coordinates
/// (y pointing down).
pub fn quad_area(q: &Quad) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

/// Side lengths `[TL-TR, TR-BR, BR-BL, BL-TL]`.
pub fn quad_side_lengths(q: &Quad) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for (i, side) in out.iter_mut().enumerate() {
        *side = (q[(i + 1) % 4] - q[i]).norm();
    }
    out
}

/// True when all turns have the same sign and none is degenerate.
pub fn is_convex_quad(q: &Quad) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        let c = q[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < 1e-6 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
