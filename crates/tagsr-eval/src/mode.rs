//! Pipeline modes, evaluation protocols and the image variants they report.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which transform chain is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineMode {
    /// Super-resolution only.
    Sr,
    /// Denoise only.
    Dn,
    /// Super-resolution, then denoise on its outputs.
    SrDn,
    /// Denoise, then super-resolution on the denoised image.
    DnSr,
}

impl PipelineMode {
    pub const ALL: [PipelineMode; 4] = [Self::Sr, Self::Dn, Self::SrDn, Self::DnSr];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sr => "SR",
            Self::Dn => "DN",
            Self::SrDn => "SRDN",
            Self::DnSr => "DNSR",
        }
    }

    /// Whether the mode chains two models.
    pub fn is_chained(self) -> bool {
        matches!(self, Self::SrDn | Self::DnSr)
    }

    /// Variants reported for this mode, in report order.
    pub fn variants(self, protocol: Protocol) -> &'static [Variant] {
        use Variant::*;
        match (protocol, self) {
            (Protocol::SingleTag, Self::Sr) => &[GroundTruth, LowRes, SuperResolved, Bicubic],
            (_, Self::Dn) => &[Original, Denoised],
            (Protocol::SingleTag, Self::SrDn) => &[
                GroundTruth,
                LowRes,
                SuperResolved,
                Bicubic,
                DenoisedBicubic,
                DenoisedHr,
            ],
            (Protocol::SingleTag, Self::DnSr) => {
                &[Bicubic, SuperResolved, DenoisedBicubic, DenoisedHr]
            }
            (Protocol::FalseNegative, Self::Sr) => &[GroundTruth, SuperResolved, Bicubic],
            (Protocol::FalseNegative, Self::SrDn) => &[
                GroundTruth,
                SuperResolved,
                Bicubic,
                DenoisedBicubic,
                DenoisedHr,
            ],
            (Protocol::FalseNegative, Self::DnSr) => &[Bicubic, DenoisedHr],
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownMode(s.to_string()))
    }
}

/// Evaluation protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// One marker per image: the square crop is downsampled to the model
    /// input size before the transforms run, and the identity can be checked
    /// against the file name.
    #[default]
    SingleTag,
    /// Images where a baseline detector missed the marker: transforms run
    /// on the full-resolution crop and identity is never checked.
    FalseNegative,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleTag => "single-tag",
            Self::FalseNegative => "false-negative",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image produced for a sample and handed to the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    GroundTruth,
    LowRes,
    SuperResolved,
    Bicubic,
    Original,
    Denoised,
    DenoisedBicubic,
    DenoisedHr,
}

impl Variant {
    /// Label used in the text report.
    pub fn label(self) -> &'static str {
        match self {
            Self::GroundTruth => "Ground truth",
            Self::LowRes => "LR",
            Self::SuperResolved => "HR",
            Self::Bicubic => "Bicubic",
            Self::Original => "Original",
            Self::Denoised => "Denoised",
            Self::DenoisedBicubic => "Denoised bicubic",
            Self::DenoisedHr => "Denoised HR",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("srdn".parse::<PipelineMode>().unwrap(), PipelineMode::SrDn);
        assert_eq!(" DN ".parse::<PipelineMode>().unwrap(), PipelineMode::Dn);
        for m in PipelineMode::ALL {
            assert_eq!(m.as_str().parse::<PipelineMode>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_mode_is_a_config_error() {
        let err = "XYZ".parse::<PipelineMode>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMode(ref s) if s == "XYZ"));
    }

    #[test]
    fn serde_uses_upper_case_tokens() {
        let json = serde_json::to_string(&PipelineMode::DnSr).unwrap();
        assert_eq!(json, "\"DNSR\"");
        let p: Protocol = serde_json::from_str("\"false-negative\"").unwrap();
        assert_eq!(p, Protocol::FalseNegative);
    }

    #[test]
    fn report_orders() {
        let labels = |m: PipelineMode, p| m.variants(p).iter().map(|v| v.label()).collect::<Vec<_>>();
        assert_eq!(
            labels(PipelineMode::Sr, Protocol::SingleTag),
            ["Ground truth", "LR", "HR", "Bicubic"]
        );
        assert_eq!(labels(PipelineMode::Dn, Protocol::SingleTag), ["Original", "Denoised"]);
        assert_eq!(PipelineMode::SrDn.variants(Protocol::SingleTag).len(), 6);
        assert_eq!(
            labels(PipelineMode::DnSr, Protocol::SingleTag),
            ["Bicubic", "HR", "Denoised bicubic", "Denoised HR"]
        );
        assert_eq!(
            labels(PipelineMode::DnSr, Protocol::FalseNegative),
            ["Bicubic", "Denoised HR"]
        );
    }

    #[test]
    fn variants_are_unique_per_mode() {
        for p in [Protocol::SingleTag, Protocol::FalseNegative] {
            for m in PipelineMode::ALL {
                let vs = m.variants(p);
                let mut sorted = vs.to_vec();
                sorted.sort();
                sorted.dedup();
                assert_eq!(sorted.len(), vs.len(), "{m} {p}");
            }
        }
    }
}
