use std::path::PathBuf;

use crate::mode::PipelineMode;

/// Invalid run configuration. Always reported before any image is processed.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown pipeline mode {0:?} (expected one of SR, DN, SRDN, DNSR)")]
    UnknownMode(String),
    #[error("pipeline mode {mode} needs a second model")]
    MissingSecondModel { mode: PipelineMode },
    #[error("pipeline mode {mode} takes a single model, but a second model was given")]
    UnexpectedSecondModel { mode: PipelineMode },
    #[error("sample fraction must be in (0, 1], got {0}")]
    SampleFraction(f64),
    #[error("no image extensions configured")]
    NoExtensions,
    #[error("cannot read image folder {}", path.display())]
    ImageFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("identity verification is not available for the false-negative protocol")]
    VerifyIdUnsupported,
    #[error("cannot load model description from {}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("model at {} is a {found} model, expected a {expected} model", path.display())]
    ModelKind {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot load marker dictionary from {}", path.display())]
    Dictionary {
        path: PathBuf,
        #[source]
        source: tagsr_aruco::DictionaryError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid model description: {0}")]
    Invalid(String),
}

/// Failure inside a transform stage.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("empty input image ({width}x{height})")]
    EmptyInput { width: u32, height: u32 },
    #[error("{model}: expected a {expected_w}x{expected_h} output, got {got_w}x{got_h}")]
    OutputShape {
        model: String,
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },
    #[error("{width}x{height} image scaled by {scale} exceeds the {max}px side limit")]
    OutputTooLarge {
        width: u32,
        height: u32,
        scale: u32,
        max: u32,
    },
    #[error("{model}: {message}")]
    Model { model: String, message: String },
}

/// Failure of a single evaluation sample. The run skips the sample and
/// continues.
#[derive(thiserror::Error, Debug)]
pub enum SampleError {
    #[error("cannot read image {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no marker id in file name {name:?}")]
    MissingId { name: String },
    #[error("{stage} stage failed")]
    Transform {
        stage: &'static str,
        #[source]
        source: TransformError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("no samples processed")]
    NoSamples,
    #[error("cannot write report to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize report for {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by [`crate::run_evaluation`].
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
