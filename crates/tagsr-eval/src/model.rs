//! Model descriptions on disk and the concrete transform implementations.
//!
//! A model directory holds a `model.json` describing the model. The
//! description is resolved once, at configuration time, into a
//! [`ModelChain`]; evaluation code never inspects model kinds again.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path};

use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModelError, TransformError};
use crate::mode::PipelineMode;
use crate::transform::{scaled_size, Denoiser, SuperResolver, MAX_OUTPUT_SIDE};

/// File name of the model description inside a model directory.
pub const MODEL_FILE: &str = "model.json";

/// Resampling kernel of a classical upscaler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(f: ResampleFilter) -> Self {
        match f {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Unsharp mask applied after upscaling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharpenSpec {
    pub sigma: f32,
    #[serde(default)]
    pub threshold: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DenoiseMethod {
    Gaussian { sigma: f32 },
    Median { radius: u32 },
}

/// Contents of `model.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    SuperResolution {
        #[serde(default)]
        input_size: Option<u32>,
        #[serde(default = "default_scale")]
        scale: u32,
        #[serde(default)]
        filter: ResampleFilter,
        #[serde(default)]
        sharpen: Option<SharpenSpec>,
    },
    Denoise {
        #[serde(default)]
        input_size: Option<u32>,
        method: DenoiseMethod,
    },
}

fn default_scale() -> u32 {
    2
}

impl ModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SuperResolution { .. } => "super_resolution",
            Self::Denoise { .. } => "denoise",
        }
    }

    /// Read `<dir>/model.json`.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let file = File::open(dir.join(MODEL_FILE))?;
        let spec: Self = serde_json::from_reader(BufReader::new(file))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Write `<dir>/model.json`, creating `dir` if needed.
    pub fn write(&self, dir: &Path) -> Result<(), ModelError> {
        std::fs::create_dir_all(dir)?;
        let file = File::create(dir.join(MODEL_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let input_size = match self {
            Self::SuperResolution {
                input_size,
                scale,
                sharpen,
                ..
            } => {
                if *scale < 1 {
                    return Err(ModelError::Invalid(format!("scale must be >= 1, got {scale}")));
                }
                let side = input_size.unwrap_or(1);
                if side.checked_mul(*scale).map_or(true, |s| s > MAX_OUTPUT_SIDE) {
                    return Err(ModelError::Invalid(format!(
                        "scale {scale} on a {side}px input exceeds the {MAX_OUTPUT_SIDE}px output limit"
                    )));
                }
                if let Some(s) = sharpen {
                    if !(s.sigma.is_finite() && s.sigma > 0.0) {
                        return Err(ModelError::Invalid(format!(
                            "sharpen sigma must be positive, got {}",
                            s.sigma
                        )));
                    }
                }
                input_size
            }
            Self::Denoise { input_size, method } => {
                if let DenoiseMethod::Gaussian { sigma } = method {
                    if !(sigma.is_finite() && *sigma > 0.0) {
                        return Err(ModelError::Invalid(format!(
                            "gaussian sigma must be positive, got {sigma}"
                        )));
                    }
                }
                input_size
            }
        };
        if *input_size == Some(0) {
            return Err(ModelError::Invalid("input_size must be positive".into()));
        }
        Ok(())
    }
}

/// Display name of a model directory: its last path component.
pub fn model_name(dir: &Path) -> String {
    dir.components()
        .rev()
        .find_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap_or_else(|| dir.display().to_string())
}

/// Resampling upscaler with an optional unsharp mask.
#[derive(Clone, Debug)]
pub struct ClassicalUpscaler {
    name: String,
    input_size: Option<u32>,
    scale: u32,
    filter: ResampleFilter,
    sharpen: Option<SharpenSpec>,
}

impl ClassicalUpscaler {
    pub fn new(name: impl Into<String>, scale: u32, filter: ResampleFilter) -> Self {
        Self {
            name: name.into(),
            input_size: None,
            scale: scale.max(1),
            filter,
            sharpen: None,
        }
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = Some(size);
        self
    }

    pub fn with_sharpen(mut self, sharpen: SharpenSpec) -> Self {
        self.sharpen = Some(sharpen);
        self
    }
}

impl SuperResolver for ClassicalUpscaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> Option<u32> {
        self.input_size
    }

    fn scale(&self) -> u32 {
        self.scale
    }

    fn upscale(&self, image: &GrayImage) -> Result<GrayImage, TransformError> {
        let (w, h) = scaled_size(image, self.scale)?;
        let up = imageops::resize(image, w, h, self.filter.into());
        Ok(match self.sharpen {
            Some(s) => imageops::unsharpen(&up, s.sigma, s.threshold),
            None => up,
        })
    }
}

/// Gaussian or median filter denoiser.
#[derive(Clone, Debug)]
pub struct ClassicalDenoiser {
    name: String,
    input_size: Option<u32>,
    method: DenoiseMethod,
}

impl ClassicalDenoiser {
    pub fn new(name: impl Into<String>, method: DenoiseMethod) -> Self {
        Self {
            name: name.into(),
            input_size: None,
            method,
        }
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = Some(size);
        self
    }
}

impl Denoiser for ClassicalDenoiser {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> Option<u32> {
        self.input_size
    }

    fn denoise(&self, image: &GrayImage) -> Result<GrayImage, TransformError> {
        Ok(match self.method {
            DenoiseMethod::Gaussian { sigma } => imageops::blur(image, sigma),
            DenoiseMethod::Median { radius } => {
                imageproc::filter::median_filter(image, radius, radius)
            }
        })
    }
}

fn read_spec(dir: &Path) -> Result<ModelSpec, ConfigError> {
    ModelSpec::load(dir).map_err(|source| ConfigError::Model {
        path: dir.join(MODEL_FILE),
        source,
    })
}

/// Load a super-resolution model directory.
pub fn load_super_resolver(dir: &Path) -> Result<Box<dyn SuperResolver>, ConfigError> {
    match read_spec(dir)? {
        ModelSpec::SuperResolution {
            input_size,
            scale,
            filter,
            sharpen,
        } => {
            let mut model = ClassicalUpscaler::new(model_name(dir), scale, filter);
            if let Some(size) = input_size {
                model = model.with_input_size(size);
            }
            if let Some(s) = sharpen {
                model = model.with_sharpen(s);
            }
            log::debug!("loaded super-resolution model {} (x{scale})", model.name());
            Ok(Box::new(model))
        }
        other => Err(ConfigError::ModelKind {
            path: dir.to_path_buf(),
            expected: "super_resolution",
            found: other.kind(),
        }),
    }
}

/// Load a denoise model directory.
pub fn load_denoiser(dir: &Path) -> Result<Box<dyn Denoiser>, ConfigError> {
    match read_spec(dir)? {
        ModelSpec::Denoise { input_size, method } => {
            let mut model = ClassicalDenoiser::new(model_name(dir), method);
            if let Some(size) = input_size {
                model = model.with_input_size(size);
            }
            log::debug!("loaded denoise model {} ({method:?})", model.name());
            Ok(Box::new(model))
        }
        other => Err(ConfigError::ModelKind {
            path: dir.to_path_buf(),
            expected: "denoise",
            found: other.kind(),
        }),
    }
}

/// The models of one run, bound to the pipeline mode.
pub enum ModelChain {
    Sr(Box<dyn SuperResolver>),
    Dn(Box<dyn Denoiser>),
    SrDn {
        sr: Box<dyn SuperResolver>,
        dn: Box<dyn Denoiser>,
    },
    DnSr {
        dn: Box<dyn Denoiser>,
        sr: Box<dyn SuperResolver>,
    },
}

impl ModelChain {
    /// Load the models for `mode`. For chained modes `first` is the model
    /// applied first (SR for `SRDN`, DN for `DNSR`).
    pub fn load(
        mode: PipelineMode,
        first: &Path,
        second: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let second = match (mode.is_chained(), second) {
            (true, None) => return Err(ConfigError::MissingSecondModel { mode }),
            (false, Some(_)) => return Err(ConfigError::UnexpectedSecondModel { mode }),
            (_, s) => s,
        };
        Ok(match (mode, second) {
            (PipelineMode::Sr, _) => Self::Sr(load_super_resolver(first)?),
            (PipelineMode::Dn, _) => Self::Dn(load_denoiser(first)?),
            (PipelineMode::SrDn, Some(second)) => Self::SrDn {
                sr: load_super_resolver(first)?,
                dn: load_denoiser(second)?,
            },
            (PipelineMode::DnSr, Some(second)) => Self::DnSr {
                dn: load_denoiser(first)?,
                sr: load_super_resolver(second)?,
            },
            (mode, None) => return Err(ConfigError::MissingSecondModel { mode }),
        })
    }

    pub fn mode(&self) -> PipelineMode {
        match self {
            Self::Sr(_) => PipelineMode::Sr,
            Self::Dn(_) => PipelineMode::Dn,
            Self::SrDn { .. } => PipelineMode::SrDn,
            Self::DnSr { .. } => PipelineMode::DnSr,
        }
    }

    /// Model names in application order.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Sr(sr) => vec![sr.name().to_string()],
            Self::Dn(dn) => vec![dn.name().to_string()],
            Self::SrDn { sr, dn } => vec![sr.name().to_string(), dn.name().to_string()],
            Self::DnSr { dn, sr } => vec![dn.name().to_string(), sr.name().to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn write_model(dir: &Path, json: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(MODEL_FILE), json).unwrap();
    }

    #[test]
    fn parses_super_resolution_spec_with_defaults() {
        let spec: ModelSpec = serde_json::from_str(r#"{"kind": "super_resolution"}"#).unwrap();
        assert_eq!(
            spec,
            ModelSpec::SuperResolution {
                input_size: None,
                scale: 2,
                filter: ResampleFilter::CatmullRom,
                sharpen: None,
            }
        );
    }

    #[test]
    fn loads_denoiser_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("median3");
        write_model(
            &dir,
            r#"{"kind": "denoise", "input_size": 32, "method": {"type": "median", "radius": 1}}"#,
        );
        let dn = load_denoiser(&dir).unwrap();
        assert_eq!(dn.name(), "median3");
        assert_eq!(dn.input_size(), Some(32));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = ModelSpec::Denoise {
            input_size: None,
            method: DenoiseMethod::Gaussian { sigma: 1.0 },
        };
        spec.write(tmp.path()).unwrap();
        let err = load_super_resolver(tmp.path()).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::ModelKind {
                expected: "super_resolution",
                found: "denoise",
                ..
            }
        ));
    }

    #[test]
    fn missing_model_file_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_denoiser(tmp.path()).err().unwrap(),
            ConfigError::Model { .. }
        ));
    }

    #[test]
    fn zero_scale_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        write_model(tmp.path(), r#"{"kind": "super_resolution", "scale": 0}"#);
        let err = ModelSpec::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn oversized_scale_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        write_model(
            tmp.path(),
            r#"{"kind": "super_resolution", "input_size": 16, "scale": 536870912}"#,
        );
        assert!(matches!(
            load_super_resolver(tmp.path()).err().unwrap(),
            ConfigError::Model {
                source: ModelError::Invalid(_),
                ..
            }
        ));

        write_model(tmp.path(), r#"{"kind": "super_resolution", "input_size": 4096, "scale": 16}"#);
        assert!(matches!(ModelSpec::load(tmp.path()), Err(ModelError::Invalid(_))));

        write_model(tmp.path(), r#"{"kind": "super_resolution", "input_size": 4096, "scale": 8}"#);
        assert!(ModelSpec::load(tmp.path()).is_ok());
    }

    #[test]
    fn upscaler_rejects_overflowing_output() {
        let sr = ClassicalUpscaler::new("huge", 1 << 29, ResampleFilter::Nearest);
        let err = sr.upscale(&GrayImage::new(32, 32)).unwrap_err();
        assert!(matches!(err, TransformError::OutputTooLarge { scale, .. } if scale == 1 << 29));
    }

    #[test]
    fn chained_mode_requires_second_model() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ModelChain::load(PipelineMode::SrDn, tmp.path(), None).err().unwrap();
        assert!(matches!(err, ConfigError::MissingSecondModel { mode: PipelineMode::SrDn }));

        let err = ModelChain::load(PipelineMode::Sr, tmp.path(), Some(tmp.path()))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnexpectedSecondModel { .. }));
    }

    #[test]
    fn dnsr_chain_loads_in_application_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dn_dir = tmp.path().join("gauss");
        let sr_dir = tmp.path().join("bicubic_x2");
        write_model(&dn_dir, r#"{"kind": "denoise", "method": {"type": "gaussian", "sigma": 0.8}}"#);
        write_model(&sr_dir, r#"{"kind": "super_resolution", "scale": 2}"#);

        let chain = ModelChain::load(PipelineMode::DnSr, &dn_dir, Some(&sr_dir)).unwrap();
        assert_eq!(chain.mode(), PipelineMode::DnSr);
        assert_eq!(chain.names(), ["gauss", "bicubic_x2"]);
    }

    #[test]
    fn classical_models_preserve_expected_shapes() {
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        let sr = ClassicalUpscaler::new("x3", 3, ResampleFilter::Lanczos3)
            .with_sharpen(SharpenSpec { sigma: 1.0, threshold: 2 });
        assert_eq!(sr.upscale(&img).unwrap().dimensions(), (60, 60));

        let dn = ClassicalDenoiser::new("med", DenoiseMethod::Median { radius: 2 });
        let out = dn.denoise(&img).unwrap();
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.get_pixel(2, 2)[0], 0);
        assert_eq!(out.get_pixel(17, 2)[0], 255);
    }

    #[test]
    fn model_name_is_last_component() {
        assert_eq!(model_name(Path::new("saved_models/SR/edsr_x2/")), "edsr_x2");
        assert_eq!(model_name(Path::new("./dn")), "dn");
    }
}
