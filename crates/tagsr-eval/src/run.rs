use std::path::PathBuf;
use std::time::Instant;

use tagsr_aruco::{ArucoDetector, Dictionary};

use crate::config::EvaluationConfig;
use crate::detector::MarkerDetector;
use crate::error::{ConfigError, EvalError};
use crate::model::ModelChain;
use crate::pipeline::Composer;
use crate::report::Report;
use crate::sample::{discover_samples, select_samples};

/// Result of a completed run.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub report: Report,
    /// Where the text report was written.
    pub report_path: PathBuf,
}

/// Load models and dictionary from `cfg` and evaluate.
pub fn run_evaluation(cfg: &EvaluationConfig) -> Result<Evaluation, EvalError> {
    cfg.validate()?;
    let models = ModelChain::load(cfg.mode, &cfg.model, cfg.second_model.as_deref())?;
    let dict = Dictionary::load_json(&cfg.dictionary).map_err(|source| ConfigError::Dictionary {
        path: cfg.dictionary.clone(),
        source,
    })?;
    log::info!(
        "dictionary {} ({} markers, {}x{} bits)",
        dict.name,
        dict.len(),
        dict.marker_size,
        dict.marker_size
    );
    let detector = ArucoDetector::new(dict, cfg.detector.clone());
    evaluate_with(cfg, &models, &detector)
}

/// Evaluate with already constructed models and detector. The mode and
/// model paths of `cfg` only name the report.
pub fn evaluate_with<D: MarkerDetector + ?Sized>(
    cfg: &EvaluationConfig,
    models: &ModelChain,
    detector: &D,
) -> Result<Evaluation, EvalError> {
    cfg.validate()?;
    let started = Instant::now();

    let paths = discover_samples(&cfg.images, &cfg.extensions)?;
    let total = paths.len();
    let samples = select_samples(paths, cfg.sample_fraction, cfg.seed);
    log::info!(
        "{} evaluation ({}) of {} on {} of {} images",
        models.mode(),
        cfg.protocol,
        models.names().join(" -> "),
        samples.len(),
        total
    );

    let composer = Composer::new(models, detector, cfg.protocol).verify_id(cfg.verify_id);
    let metrics = composer.run(&samples);
    if !metrics.skipped().is_empty() {
        log::warn!("skipped {} of {} images", metrics.skipped().len(), samples.len());
    }

    let report = Report::from_metrics(
        models.mode(),
        cfg.protocol,
        models.names(),
        &metrics,
        started.elapsed(),
    )?;
    let report_path = cfg.report_path();
    report.write(&report_path)?;
    log::info!("report written to {}", report_path.display());

    Ok(Evaluation {
        report,
        report_path,
    })
}
