//! Run configuration.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use tagsr_aruco::ArucoDetectorParams;

use crate::error::ConfigError;
use crate::mode::{PipelineMode, Protocol};
use crate::report::report_path;

/// Everything an evaluation run needs, fixed before the first image is read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub mode: PipelineMode,
    /// Model directory. For chained modes, the model applied first.
    pub model: PathBuf,
    /// Model applied second (`SRDN`: denoise, `DNSR`: super-resolution).
    #[serde(default)]
    pub second_model: Option<PathBuf>,
    pub images: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Fraction of discovered images to evaluate, in `(0, 1]`.
    #[serde(default = "default_fraction")]
    pub sample_fraction: f64,
    /// Check detected ids against the id encoded in each file name.
    #[serde(default)]
    pub verify_id: bool,
    /// Seed for sample selection; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub protocol: Protocol,
    /// ArUco dictionary JSON.
    pub dictionary: PathBuf,
    #[serde(default)]
    pub detector: ArucoDetectorParams,
    /// Root directory of chained-mode reports.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

fn default_fraction() -> f64 {
    1.0
}

fn default_output_root() -> PathBuf {
    PathBuf::from("saved_models")
}

impl EvaluationConfig {
    /// Config with defaults for everything but the required paths.
    pub fn new(
        mode: PipelineMode,
        model: impl Into<PathBuf>,
        images: impl Into<PathBuf>,
        dictionary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            model: model.into(),
            second_model: None,
            images: images.into(),
            extensions: default_extensions(),
            sample_fraction: default_fraction(),
            verify_id: false,
            seed: None,
            protocol: Protocol::default(),
            dictionary: dictionary.into(),
            detector: ArucoDetectorParams::default(),
            output_root: default_output_root(),
        }
    }

    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Check the configuration without touching models or images.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.mode.is_chained(), &self.second_model) {
            (true, None) => return Err(ConfigError::MissingSecondModel { mode: self.mode }),
            (false, Some(_)) => return Err(ConfigError::UnexpectedSecondModel { mode: self.mode }),
            _ => {}
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(ConfigError::SampleFraction(self.sample_fraction));
        }
        if self.extensions.iter().all(|e| e.trim().trim_start_matches('.').is_empty()) {
            return Err(ConfigError::NoExtensions);
        }
        if self.verify_id && self.protocol == Protocol::FalseNegative {
            return Err(ConfigError::VerifyIdUnsupported);
        }
        Ok(())
    }

    /// Text report location for this run.
    pub fn report_path(&self) -> PathBuf {
        report_path(
            &self.output_root,
            self.mode,
            &self.model,
            self.second_model.as_deref(),
        )
    }
}

/// Process-wide settings applied once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub log_level: LevelFilter,
    /// Use the `tracing` subscriber instead of the plain logger. Only
    /// effective with the `tracing` feature.
    pub tracing: bool,
    pub json_logs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            tracing: false,
            json_logs: false,
        }
    }
}

impl RuntimeConfig {
    /// Install the global logger. Later calls are no-ops.
    pub fn init(&self) {
        #[cfg(feature = "tracing")]
        {
            if self.tracing {
                tagsr_core::init_tracing(self.log_level, self.json_logs);
                return;
            }
        }
        if tagsr_core::init_with_level(self.log_level).is_err() {
            log::debug!("logger already installed");
        }
    }
}
