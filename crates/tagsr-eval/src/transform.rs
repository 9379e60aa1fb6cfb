//! Model seams and the stage wrappers that prepare their inputs.
//!
//! A [`SuperResolver`] maps a grayscale image to one `scale()` times larger,
//! a [`Denoiser`] maps an image to one of the same size. The stage functions
//! below own the geometry around the models (square crop, downsampling to the
//! model input size, bicubic baselines) so model implementations only see
//! ready-to-use rasters.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::error::TransformError;

/// Learned (or classical) upscaler.
pub trait SuperResolver {
    fn name(&self) -> &str;
    /// Side of the square input the model expects, if fixed.
    fn input_size(&self) -> Option<u32>;
    /// Integer upscaling factor.
    fn scale(&self) -> u32;
    fn upscale(&self, image: &GrayImage) -> Result<GrayImage, TransformError>;
}

/// Learned (or classical) same-size denoiser.
pub trait Denoiser {
    fn name(&self) -> &str;
    fn input_size(&self) -> Option<u32>;
    fn denoise(&self, image: &GrayImage) -> Result<GrayImage, TransformError>;
}

/// Outputs of one super-resolution pass.
#[derive(Clone, Debug)]
pub struct SrOutput {
    /// Model output.
    pub hr: GrayImage,
    /// Model input.
    pub lr: GrayImage,
    /// `lr` upscaled bicubically to the size of `hr`.
    pub bicubic: GrayImage,
}

/// Outputs of one denoise pass.
#[derive(Clone, Debug)]
pub struct DnOutput {
    pub denoised: GrayImage,
    /// The denoiser input (square crop, resized to the model input size).
    pub original: GrayImage,
}

/// Largest output side a stage will produce.
pub const MAX_OUTPUT_SIDE: u32 = 1 << 15;

/// Dimensions of `image` scaled by `scale`, bounded by [`MAX_OUTPUT_SIDE`].
pub fn scaled_size(image: &GrayImage, scale: u32) -> Result<(u32, u32), TransformError> {
    let (width, height) = image.dimensions();
    let too_large = || TransformError::OutputTooLarge {
        width,
        height,
        scale,
        max: MAX_OUTPUT_SIDE,
    };
    let w = width.checked_mul(scale).ok_or_else(too_large)?;
    let h = height.checked_mul(scale).ok_or_else(too_large)?;
    if w > MAX_OUTPUT_SIDE || h > MAX_OUTPUT_SIDE {
        return Err(too_large());
    }
    Ok((w, h))
}

/// Top-left square crop of side `min(width, height)`.
pub fn crop_square(image: &GrayImage) -> GrayImage {
    let side = image.width().min(image.height());
    imageops::crop_imm(image, 0, 0, side, side).to_image()
}

/// Bicubic upscale by an integer factor.
pub fn bicubic_upscale(image: &GrayImage, scale: u32) -> Result<GrayImage, TransformError> {
    let (w, h) = scaled_size(image, scale)?;
    Ok(imageops::resize(image, w, h, FilterType::CatmullRom))
}

fn prepare_input(image: &GrayImage, input_size: Option<u32>) -> Result<GrayImage, TransformError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TransformError::EmptyInput {
            width: image.width(),
            height: image.height(),
        });
    }
    let square = crop_square(image);
    Ok(match input_size {
        Some(size) if size != square.width() => {
            imageops::resize(&square, size, size, FilterType::CatmullRom)
        }
        _ => square,
    })
}

fn check_shape(
    model: &str,
    out: &GrayImage,
    expected_w: u32,
    expected_h: u32,
) -> Result<(), TransformError> {
    if out.dimensions() != (expected_w, expected_h) {
        return Err(TransformError::OutputShape {
            model: model.to_string(),
            expected_w,
            expected_h,
            got_w: out.width(),
            got_h: out.height(),
        });
    }
    Ok(())
}

/// Super-resolution stage: square crop, downsample to the model input size,
/// run the model and build the bicubic baseline from the same input.
pub fn super_resolve(
    model: &dyn SuperResolver,
    image: &GrayImage,
) -> Result<SrOutput, TransformError> {
    let lr = prepare_input(image, model.input_size())?;
    let (w, h) = scaled_size(&lr, model.scale())?;
    let hr = model.upscale(&lr)?;
    check_shape(model.name(), &hr, w, h)?;
    let bicubic = bicubic_upscale(&lr, model.scale())?;
    Ok(SrOutput { hr, lr, bicubic })
}

/// Super-resolution on the full-resolution square crop (no downsampling).
pub fn enhance(model: &dyn SuperResolver, image: &GrayImage) -> Result<GrayImage, TransformError> {
    let square = prepare_input(image, None)?;
    let (w, h) = scaled_size(&square, model.scale())?;
    let hr = model.upscale(&square)?;
    check_shape(model.name(), &hr, w, h)?;
    Ok(hr)
}

/// Denoise stage: square crop, resize to the model input size, run the model.
pub fn denoise(model: &dyn Denoiser, image: &GrayImage) -> Result<DnOutput, TransformError> {
    let original = prepare_input(image, model.input_size())?;
    let denoised = model.denoise(&original)?;
    check_shape(model.name(), &denoised, original.width(), original.height())?;
    Ok(DnOutput { denoised, original })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    struct Nearest2x;

    impl SuperResolver for Nearest2x {
        fn name(&self) -> &str {
            "nearest2x"
        }
        fn input_size(&self) -> Option<u32> {
            Some(16)
        }
        fn scale(&self) -> u32 {
            2
        }
        fn upscale(&self, image: &GrayImage) -> Result<GrayImage, TransformError> {
            Ok(imageops::resize(
                image,
                image.width() * 2,
                image.height() * 2,
                FilterType::Nearest,
            ))
        }
    }

    struct HugeScale;

    impl SuperResolver for HugeScale {
        fn name(&self) -> &str {
            "huge"
        }
        fn input_size(&self) -> Option<u32> {
            Some(16)
        }
        fn scale(&self) -> u32 {
            1 << 29
        }
        fn upscale(&self, _image: &GrayImage) -> Result<GrayImage, TransformError> {
            unreachable!("output size is checked before the model runs")
        }
    }

    struct Shrinker;

    impl Denoiser for Shrinker {
        fn name(&self) -> &str {
            "shrinker"
        }
        fn input_size(&self) -> Option<u32> {
            None
        }
        fn denoise(&self, image: &GrayImage) -> Result<GrayImage, TransformError> {
            Ok(GrayImage::new(image.width() / 2, image.height()))
        }
    }

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    #[test]
    fn crop_takes_top_left_square() {
        let img = gradient(40, 24);
        let sq = crop_square(&img);
        assert_eq!(sq.dimensions(), (24, 24));
        assert_eq!(sq.get_pixel(23, 5), img.get_pixel(23, 5));
    }

    #[test]
    fn super_resolve_sizes() {
        let out = super_resolve(&Nearest2x, &gradient(50, 30)).unwrap();
        assert_eq!(out.lr.dimensions(), (16, 16));
        assert_eq!(out.hr.dimensions(), (32, 32));
        assert_eq!(out.bicubic.dimensions(), (32, 32));
    }

    #[test]
    fn enhance_keeps_full_resolution() {
        let hr = enhance(&Nearest2x, &gradient(30, 50)).unwrap();
        assert_eq!(hr.dimensions(), (60, 60));
    }

    #[test]
    fn wrong_output_shape_is_reported() {
        let err = denoise(&Shrinker, &gradient(10, 10)).unwrap_err();
        assert!(matches!(err, TransformError::OutputShape { got_w: 5, .. }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = super_resolve(&Nearest2x, &GrayImage::new(0, 12)).unwrap_err();
        assert_eq!(err, TransformError::EmptyInput { width: 0, height: 12 });
    }

    #[test]
    fn overflowing_scale_is_an_error() {
        let err = super_resolve(&HugeScale, &gradient(32, 32)).unwrap_err();
        assert_eq!(
            err,
            TransformError::OutputTooLarge {
                width: 16,
                height: 16,
                scale: 1 << 29,
                max: MAX_OUTPUT_SIDE,
            }
        );
        assert!(matches!(
            enhance(&HugeScale, &gradient(8, 8)),
            Err(TransformError::OutputTooLarge { .. })
        ));
        assert!(bicubic_upscale(&gradient(8, 8), u32::MAX).is_err());
        assert_eq!(scaled_size(&gradient(8, 4), 3).unwrap(), (24, 12));
    }
}
