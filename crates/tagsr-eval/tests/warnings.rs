use std::sync::{Mutex, OnceLock};

use image::{GrayImage, Luma};
use log::{Level, LevelFilter, Log, Metadata, Record};
use tagsr_eval::{
    evaluate_with, Denoiser, EvaluationConfig, MarkerDetector, ModelChain, PipelineMode,
    TransformError,
};

/// Keeps every warning emitted during the test binary's lifetime.
struct Capture(Mutex<Vec<String>>);

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

fn capture() -> &'static Capture {
    static LOGGER: OnceLock<&'static Capture> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let logger: &'static Capture = Box::leak(Box::new(Capture(Mutex::new(Vec::new()))));
        log::set_logger(logger).unwrap();
        log::set_max_level(LevelFilter::Warn);
        logger
    })
}

fn warnings_about(name: &str) -> Vec<String> {
    capture()
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|l| l.contains(name))
        .cloned()
        .collect()
}

/// Reports the id stored in the top-left pixel, plus any extras.
struct PixelId(Vec<u32>);

impl MarkerDetector for PixelId {
    fn detect(&self, image: &GrayImage) -> Vec<u32> {
        let mut ids = vec![image.get_pixel(0, 0)[0] as u32];
        ids.extend(&self.0);
        ids
    }
}

struct Identity;

impl Denoiser for Identity {
    fn name(&self) -> &str {
        "identity"
    }
    fn input_size(&self) -> Option<u32> {
        None
    }
    fn denoise(&self, image: &GrayImage) -> Result<GrayImage, TransformError> {
        Ok(image.clone())
    }
}

fn dn_config(root: &std::path::Path, names: &[&str], value: u8) -> EvaluationConfig {
    let images = root.join("images");
    std::fs::create_dir_all(&images).unwrap();
    for name in names {
        GrayImage::from_pixel(12, 12, Luma([value]))
            .save(images.join(name))
            .unwrap();
    }
    let mut cfg = EvaluationConfig::new(
        PipelineMode::Dn,
        root.join("models/identity"),
        images,
        root.join("dict.json"),
    );
    cfg.seed = Some(5);
    cfg
}

#[test]
fn identity_mismatch_warning_names_image_and_both_ids() {
    capture();
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = dn_config(tmp.path(), &["mismatch_17.png"], 9);
    cfg.verify_id = true;

    let models = ModelChain::Dn(Box::new(Identity));
    evaluate_with(&cfg, &models, &PixelId(vec![])).unwrap();

    let lines = warnings_about("mismatch_17.png");
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines.iter().all(|l| l.contains("id 17 as 9")), "{lines:?}");
    assert!(lines.iter().any(|l| l.contains("Original")), "{lines:?}");
    assert!(lines.iter().any(|l| l.contains("Denoised")), "{lines:?}");
}

#[test]
fn ambiguous_detection_warning_carries_raw_ids() {
    capture();
    let tmp = tempfile::tempdir().unwrap();
    let cfg = dn_config(tmp.path(), &["crowded_3.png"], 3);

    let models = ModelChain::Dn(Box::new(Identity));
    evaluate_with(&cfg, &models, &PixelId(vec![41])).unwrap();

    let lines = warnings_about("crowded_3.png");
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines.iter().all(|l| l.contains("[3, 41]")), "{lines:?}");
}

#[test]
fn clean_detection_logs_no_warning() {
    capture();
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = dn_config(tmp.path(), &["quiet_6.png"], 6);
    cfg.verify_id = true;

    let models = ModelChain::Dn(Box::new(Identity));
    evaluate_with(&cfg, &models, &PixelId(vec![])).unwrap();
    assert!(warnings_about("quiet_6.png").is_empty());
}
