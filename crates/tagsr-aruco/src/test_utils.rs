use crate::Dictionary;
use tagsr_core::GrayImage;

/// 4x4 dictionary with rotation-distinct codes (pairwise distance >= 4).
pub(crate) fn test_dictionary() -> Dictionary {
    Dictionary::new("TEST_4X4_4", 4, 1, vec![0x8D2B, 0x4C71, 0xF0A5, 0x2B96]).expect("valid")
}

/// Render a marker (black border of `border` cells) on a white canvas.
pub(crate) fn render_marker(
    code: u64,
    bits: usize,
    border: usize,
    cell_px: usize,
    margin: usize,
) -> GrayImage {
    let cells = bits + 2 * border;
    let side = cells * cell_px + 2 * margin;
    let mut img = GrayImage::filled(side, side, 255);

    for cy in 0..cells {
        for cx in 0..cells {
            let is_border = cx < border || cy < border || cx >= bits + border || cy >= bits + border;
            let is_black = is_border || {
                let idx = (cy - border) * bits + (cx - border);
                (code >> idx) & 1 == 1
            };
            if !is_black {
                continue;
            }
            for yy in 0..cell_px {
                for xx in 0..cell_px {
                    let x = margin + cx * cell_px + xx;
                    let y = margin + cy * cell_px + yy;
                    img.data[y * side + x] = 0;
                }
            }
        }
    }

    img
}
