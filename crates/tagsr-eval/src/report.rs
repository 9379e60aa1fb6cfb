//! Text and JSON evaluation reports.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::ReportError;
use crate::metrics::{Metrics, SkippedSample, VariantRate};
use crate::mode::{PipelineMode, Protocol};
use crate::model::model_name;

const RULE: &str = "------------------------";

/// File name of the report of a single-model run, inside `<model>/assets/`.
pub const MODEL_REPORT_FILE: &str = "evaluation.txt";
/// File name of the report of a chained run.
pub const CHAIN_REPORT_FILE: &str = "summary.txt";

/// Final result of an evaluation run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub mode: PipelineMode,
    pub protocol: Protocol,
    pub models: Vec<String>,
    pub processed: usize,
    pub skipped: Vec<SkippedSample>,
    pub rates: Vec<VariantRate>,
    pub elapsed_secs: f64,
}

impl Report {
    pub fn from_metrics(
        mode: PipelineMode,
        protocol: Protocol,
        models: Vec<String>,
        metrics: &Metrics,
        elapsed: Duration,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            mode,
            protocol,
            models,
            processed: metrics.processed(),
            skipped: metrics.skipped().to_vec(),
            rates: metrics.rates()?,
            elapsed_secs: elapsed.as_secs_f64(),
        })
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the text report to `path` and a JSON twin next to it
    /// (same stem, `.json`). Parent directories are created as needed.
    ///
    /// Both outputs are rendered before anything touches the disk, and a
    /// failed write leaves neither file behind.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ReportError::Io { path, source }
        };

        let json_path = path.with_extension("json");
        let json = serde_json::to_vec_pretty(self).map_err(|source| ReportError::Json {
            path: json_path.clone(),
            source,
        })?;
        let text = self.render();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        std::fs::write(&json_path, json).map_err(io_err(&json_path))?;
        if let Err(source) = std::fs::write(path, text) {
            if let Err(e) = std::fs::remove_file(&json_path) {
                log::warn!("cannot remove {}: {e}", json_path.display());
            }
            return Err(io_err(path)(source));
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rates.iter().map(|r| r.label.len()).max().unwrap_or(0);
        writeln!(f, "Evaluated {} images", self.processed)?;
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped {} images", self.skipped.len())?;
        }
        writeln!(f, "Detection rates:")?;
        writeln!(f, "{RULE}")?;
        for rate in &self.rates {
            writeln!(f, "{:<width$}\t{:.2} %", rate.label, rate.percent)?;
        }
        writeln!(f, "{RULE}")?;
        write!(f, "Finished in {:.1} s", self.elapsed_secs)
    }
}

/// Where a run's text report goes.
///
/// Single-model runs write `<model>/assets/evaluation.txt`; chained runs
/// write `<output_root>/<MODE>/<first>_<second>/summary.txt`, named after
/// the two model directories.
pub fn report_path(
    output_root: &Path,
    mode: PipelineMode,
    first: &Path,
    second: Option<&Path>,
) -> PathBuf {
    match second {
        Some(second) if mode.is_chained() => output_root
            .join(mode.as_str())
            .join(format!("{}_{}", model_name(first), model_name(second)))
            .join(CHAIN_REPORT_FILE),
        _ => first.join("assets").join(MODEL_REPORT_FILE),
    }
}
