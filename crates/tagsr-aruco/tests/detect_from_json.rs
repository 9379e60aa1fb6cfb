use std::fs;

use tagsr_aruco::{ArucoDetector, ArucoDetectorParams, Dictionary};
use tagsr_core::GrayImage;

const DICT_JSON: &str = r#"{
    "name": "TEST_4X4_4",
    "marker_size": 4,
    "max_correction_bits": 1,
    "codes": [36139, 19569, 61605, 11158]
}"#;

/// Low-contrast marker (dark = 40, light = 210) on a mid-gray page.
fn render_low_contrast(code: u64, cell_px: usize, margin: usize) -> GrayImage {
    let bits = 4;
    let cells = bits + 2;
    let side = cells * cell_px + 2 * margin;
    let mut img = GrayImage::filled(side, side, 190);

    for cy in 0..cells {
        for cx in 0..cells {
            let border = cx == 0 || cy == 0 || cx == cells - 1 || cy == cells - 1;
            let black = border || (code >> ((cy - 1) * bits + (cx - 1))) & 1 == 1;
            let v = if black { 40 } else { 210 };
            for yy in 0..cell_px {
                for xx in 0..cell_px {
                    img.data[(margin + cy * cell_px + yy) * side + margin + cx * cell_px + xx] = v;
                }
            }
        }
    }
    img
}

#[test]
fn dictionary_file_drives_detection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("TEST_4X4_4.json");
    fs::write(&path, DICT_JSON).expect("write dictionary");

    let dict = Dictionary::load_json(&path).expect("load dictionary");
    assert_eq!(dict.codes[1], 0x4C71);

    let img = render_low_contrast(dict.codes[1], 9, 30);
    let detector = ArucoDetector::new(dict, ArucoDetectorParams::default());

    let dets = detector.detect(&img.view());
    assert_eq!(dets.len(), 1, "{dets:?}");
    assert_eq!(dets[0].id, 1);
    assert_eq!(dets[0].hamming, 0);
}

#[test]
fn partial_params_json_uses_defaults() {
    let params: ArucoDetectorParams =
        serde_json::from_str(r#"{"max_hamming": 0, "quads": {"min_side_px": 8.0}}"#)
            .expect("params");
    assert_eq!(params.max_hamming, Some(0));
    assert_eq!(params.quads.min_side_px, 8.0);
    assert_eq!(params.decode.border_bits, 1);
}
