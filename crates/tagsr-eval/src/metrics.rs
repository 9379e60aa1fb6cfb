//! Per-variant success counters.

use serde::Serialize;

use crate::error::ReportError;
use crate::mode::Variant;
use crate::pipeline::SampleReport;

/// Sample that could not be evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedSample {
    pub name: String,
    pub reason: String,
}

/// Detection rate of one variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VariantRate {
    pub variant: Variant,
    pub label: &'static str,
    pub detected: usize,
    /// `100 * detected / processed`.
    pub percent: f64,
}

/// Success counts accumulated over a run.
#[derive(Clone, Debug)]
pub struct Metrics {
    variants: Vec<Variant>,
    successes: Vec<usize>,
    processed: usize,
    skipped: Vec<SkippedSample>,
}

impl Metrics {
    pub fn new(variants: &[Variant]) -> Self {
        Self {
            variants: variants.to_vec(),
            successes: vec![0; variants.len()],
            processed: 0,
            skipped: Vec::new(),
        }
    }

    /// Count one evaluated sample. Each tracked variant gains at most one
    /// success per sample.
    pub fn record(&mut self, report: &SampleReport) {
        self.processed += 1;
        for (slot, variant) in self.variants.iter().enumerate() {
            if report.outcome(*variant).is_some_and(|o| o.is_success()) {
                self.successes[slot] += 1;
            }
        }
    }

    pub fn record_skip(&mut self, name: &str, reason: String) {
        self.skipped.push(SkippedSample {
            name: name.to_string(),
            reason,
        });
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Number of successfully evaluated samples.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn skipped(&self) -> &[SkippedSample] {
        &self.skipped
    }

    pub fn successes(&self, variant: Variant) -> usize {
        self.variants
            .iter()
            .position(|v| *v == variant)
            .map(|slot| self.successes[slot])
            .unwrap_or(0)
    }

    /// Detection rates in report order. Fails when no sample was processed.
    pub fn rates(&self) -> Result<Vec<VariantRate>, ReportError> {
        if self.processed == 0 {
            return Err(ReportError::NoSamples);
        }
        Ok(self
            .variants
            .iter()
            .zip(&self.successes)
            .map(|(&variant, &detected)| VariantRate {
                variant,
                label: variant.label(),
                detected,
                percent: 100.0 * detected as f64 / self.processed as f64,
            })
            .collect())
    }
}
