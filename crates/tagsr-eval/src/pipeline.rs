//! Pipeline composer: builds every image variant of a sample for the active
//! mode and runs the detector on each.

use image::{GrayImage, ImageReader};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::detector::{DetectionOutcome, MarkerDetector};
use crate::error::{SampleError, TransformError};
use crate::metrics::Metrics;
use crate::mode::{PipelineMode, Protocol, Variant};
use crate::model::ModelChain;
use crate::sample::Sample;
use crate::transform::{bicubic_upscale, denoise, enhance, super_resolve, Denoiser, SuperResolver};

/// Detection outcome of every variant of one sample.
#[derive(Clone, Debug, Serialize)]
pub struct SampleReport {
    pub name: String,
    pub outcomes: Vec<(Variant, DetectionOutcome)>,
}

impl SampleReport {
    pub fn outcome(&self, variant: Variant) -> Option<DetectionOutcome> {
        self.outcomes
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, o)| *o)
    }
}

fn sr_stage<T>(r: Result<T, TransformError>) -> Result<T, SampleError> {
    r.map_err(|source| SampleError::Transform {
        stage: "super-resolution",
        source,
    })
}

fn dn_stage<T>(r: Result<T, TransformError>) -> Result<T, SampleError> {
    r.map_err(|source| SampleError::Transform {
        stage: "denoise",
        source,
    })
}

/// Read an image file as 8-bit grayscale.
pub fn load_gray(path: &std::path::Path) -> Result<GrayImage, SampleError> {
    let read = |source: image::ImageError| SampleError::Read {
        path: path.to_path_buf(),
        source,
    };
    let image = ImageReader::open(path)
        .map_err(|e| read(e.into()))?
        .with_guessed_format()
        .map_err(|e| read(e.into()))?
        .decode()
        .map_err(read)?;
    Ok(image.to_luma8())
}

/// Runs the configured models and detector over samples.
pub struct Composer<'a, D: MarkerDetector + ?Sized> {
    models: &'a ModelChain,
    detector: &'a D,
    protocol: Protocol,
    verify_id: bool,
}

impl<'a, D: MarkerDetector + ?Sized> Composer<'a, D> {
    pub fn new(models: &'a ModelChain, detector: &'a D, protocol: Protocol) -> Self {
        Self {
            models,
            detector,
            protocol,
            verify_id: false,
        }
    }

    /// Count a detection as success only when its id matches the id encoded
    /// in the file name. Ignored by the false-negative protocol.
    pub fn verify_id(mut self, verify: bool) -> Self {
        self.verify_id = verify;
        self
    }

    pub fn mode(&self) -> PipelineMode {
        self.models.mode()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Variants this composer reports, in report order.
    pub fn report_variants(&self) -> &'static [Variant] {
        self.mode().variants(self.protocol)
    }

    /// Build all variants of `image` for the active mode, in report order.
    /// Each model is invoked once per input it needs.
    pub fn variants(&self, image: &GrayImage) -> Result<Vec<(Variant, GrayImage)>, SampleError> {
        match self.protocol {
            Protocol::SingleTag => self.single_tag_variants(image),
            Protocol::FalseNegative => self.false_negative_variants(image),
        }
    }

    fn single_tag_variants(
        &self,
        image: &GrayImage,
    ) -> Result<Vec<(Variant, GrayImage)>, SampleError> {
        use Variant::*;
        Ok(match self.models {
            ModelChain::Sr(sr) => {
                let out = sr_stage(super_resolve(sr.as_ref(), image))?;
                vec![
                    (GroundTruth, image.clone()),
                    (LowRes, out.lr),
                    (SuperResolved, out.hr),
                    (Bicubic, out.bicubic),
                ]
            }
            ModelChain::Dn(dn) => {
                let out = dn_stage(denoise(dn.as_ref(), image))?;
                vec![(Original, out.original), (Denoised, out.denoised)]
            }
            ModelChain::SrDn { sr, dn } => {
                let out = sr_stage(super_resolve(sr.as_ref(), image))?;
                let dn_hr = dn_stage(denoise(dn.as_ref(), &out.hr))?;
                let dn_bicubic = dn_stage(denoise(dn.as_ref(), &out.bicubic))?;
                vec![
                    (GroundTruth, image.clone()),
                    (LowRes, out.lr),
                    (SuperResolved, out.hr),
                    (Bicubic, out.bicubic),
                    (DenoisedBicubic, dn_bicubic.denoised),
                    (DenoisedHr, dn_hr.denoised),
                ]
            }
            ModelChain::DnSr { dn, sr } => {
                let cleaned = dn_stage(denoise(dn.as_ref(), image))?;
                let from_denoised = sr_stage(super_resolve(sr.as_ref(), &cleaned.denoised))?;
                let from_raw = sr_stage(super_resolve(sr.as_ref(), image))?;
                vec![
                    (Bicubic, from_raw.bicubic),
                    (SuperResolved, from_raw.hr),
                    (DenoisedBicubic, from_denoised.bicubic),
                    (DenoisedHr, from_denoised.hr),
                ]
            }
        })
    }

    fn false_negative_variants(
        &self,
        image: &GrayImage,
    ) -> Result<Vec<(Variant, GrayImage)>, SampleError> {
        use Variant::*;
        let upscale_pair = |sr: &dyn SuperResolver, input: &GrayImage| {
            let hr = sr_stage(enhance(sr, input))?;
            Ok::<_, SampleError>((hr, sr_stage(bicubic_upscale(input, sr.scale()))?))
        };
        let clean = |dn: &dyn Denoiser, input: &GrayImage| {
            dn_stage(denoise(dn, input)).map(|out| out.denoised)
        };

        Ok(match self.models {
            ModelChain::Sr(sr) => {
                let (hr, bicubic) = upscale_pair(sr.as_ref(), image)?;
                vec![
                    (GroundTruth, image.clone()),
                    (SuperResolved, hr),
                    (Bicubic, bicubic),
                ]
            }
            ModelChain::Dn(dn) => {
                let out = dn_stage(denoise(dn.as_ref(), image))?;
                vec![(Original, out.original), (Denoised, out.denoised)]
            }
            ModelChain::SrDn { sr, dn } => {
                let (hr, bicubic) = upscale_pair(sr.as_ref(), image)?;
                let dn_hr = clean(dn.as_ref(), &hr)?;
                let dn_bicubic = clean(dn.as_ref(), &bicubic)?;
                vec![
                    (GroundTruth, image.clone()),
                    (SuperResolved, hr),
                    (Bicubic, bicubic),
                    (DenoisedBicubic, dn_bicubic),
                    (DenoisedHr, dn_hr),
                ]
            }
            ModelChain::DnSr { dn, sr } => {
                let cleaned = clean(dn.as_ref(), image)?;
                let (hr, bicubic) = upscale_pair(sr.as_ref(), &cleaned)?;
                vec![(Bicubic, bicubic), (DenoisedHr, hr)]
            }
        })
    }

    fn expected_id(&self, sample: &Sample) -> Result<Option<u32>, SampleError> {
        if !self.verify_id || self.protocol == Protocol::FalseNegative {
            return Ok(None);
        }
        sample
            .expected_id()
            .map(Some)
            .ok_or_else(|| SampleError::MissingId {
                name: sample.name.clone(),
            })
    }

    /// Evaluate an already decoded image.
    pub fn evaluate_image(
        &self,
        name: &str,
        image: &GrayImage,
        expected: Option<u32>,
    ) -> Result<SampleReport, SampleError> {
        let outcomes = self
            .variants(image)?
            .into_iter()
            .map(|(variant, img)| {
                let ids = self.detector.detect(&img);
                let outcome = DetectionOutcome::classify(&ids, expected);
                match outcome {
                    DetectionOutcome::NoMarker => {
                        log::warn!("{name}: no marker found in {variant} image")
                    }
                    DetectionOutcome::Multiple { count } => {
                        log::warn!("{name}: {count} markers found in {variant} image: {ids:?}")
                    }
                    DetectionOutcome::WrongId { expected, found } => {
                        log::warn!("{name}: {variant} image identified id {expected} as {found}")
                    }
                    DetectionOutcome::Detected { .. } => {}
                }
                (variant, outcome)
            })
            .collect();
        Ok(SampleReport {
            name: name.to_string(),
            outcomes,
        })
    }

    /// Load and evaluate one sample.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, sample), fields(sample = %sample.name))
    )]
    pub fn evaluate_sample(&self, sample: &Sample) -> Result<SampleReport, SampleError> {
        let expected = self.expected_id(sample)?;
        let image = load_gray(&sample.path)?;
        self.evaluate_image(&sample.name, &image, expected)
    }

    /// Evaluate all samples in order. A failing sample is logged, counted as
    /// skipped and does not stop the run.
    pub fn run(&self, samples: &[Sample]) -> Metrics {
        let mut metrics = Metrics::new(self.report_variants());
        let total = samples.len();
        let step = (total / 10).max(1);

        for (i, sample) in samples.iter().enumerate() {
            match self.evaluate_sample(sample) {
                Ok(report) => metrics.record(&report),
                Err(err) => {
                    log::warn!("skipping {}: {}", sample.name, error_chain(&err));
                    metrics.record_skip(&sample.name, error_chain(&err));
                }
            }
            if (i + 1) % step == 0 || i + 1 == total {
                log::info!("processed {}/{} images", i + 1, total);
            }
        }
        metrics
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}
