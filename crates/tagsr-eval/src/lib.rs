//! Evaluation harness for image-enhancement models in front of an ArUco
//! marker detector.
//!
//! A run takes a folder of marker images, applies a super-resolution model,
//! a denoise model, or both in either order ([`PipelineMode`]), runs the
//! detector on every intermediate image ([`Variant`]) and reports the
//! fraction of images in which exactly one (optionally: the right) marker was
//! found.
//!
//! ```no_run
//! use tagsr_eval::{run_evaluation, EvaluationConfig, PipelineMode};
//!
//! let cfg = EvaluationConfig::new(
//!     PipelineMode::Sr,
//!     "saved_models/SR/bicubic_x2",
//!     "data/test",
//!     "dictionaries/DICT_6X6_250.json",
//! );
//! let eval = run_evaluation(&cfg)?;
//! println!("{}", eval.report);
//! # Ok::<(), tagsr_eval::EvalError>(())
//! ```

mod config;
mod detector;
mod error;
mod metrics;
mod mode;
mod model;
mod pipeline;
mod report;
mod run;
mod sample;
mod transform;

pub use config::{EvaluationConfig, RuntimeConfig};
pub use detector::{gray_view, DetectionOutcome, MarkerDetector};
pub use error::{ConfigError, EvalError, ModelError, ReportError, SampleError, TransformError};
pub use metrics::{Metrics, SkippedSample, VariantRate};
pub use mode::{PipelineMode, Protocol, Variant};
pub use model::{
    load_denoiser, load_super_resolver, model_name, ClassicalDenoiser, ClassicalUpscaler,
    DenoiseMethod, ModelChain, ModelSpec, ResampleFilter, SharpenSpec, MODEL_FILE,
};
pub use pipeline::{load_gray, Composer, SampleReport};
pub use report::{report_path, Report, CHAIN_REPORT_FILE, MODEL_REPORT_FILE};
pub use run::{evaluate_with, run_evaluation, Evaluation};
pub use sample::{discover_samples, parse_expected_id, select_samples, Sample};
pub use transform::{
    bicubic_upscale, crop_square, denoise, enhance, scaled_size, super_resolve, Denoiser,
    DnOutput, SrOutput, SuperResolver, MAX_OUTPUT_SIDE,
};
