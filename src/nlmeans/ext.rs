use image::{Luma, Rgb};
use imageproc::definitions::Image;
use itertools::iproduct;

use crate::error::NLMeansError;
use crate::nlmeans::color::ColorImage;
use crate::nlmeans::engine::denoise_ring;
use crate::nlmeans::format::{FrameInput, ImageFormat, RawPlane};
use crate::nlmeans::frame_ring::FrameRing;
use crate::nlmeans::integral::Backend;
use crate::nlmeans::params::NLMeansParams;

/// Spatial Non-Local Means denoising of a single 8-bit image.
///
/// Each pixel is replaced by a weighted average of the pixels in its
/// `range`x`range` search window, weighted by how closely the
/// `patch_size`x`patch_size` patch around each candidate matches the patch
/// around the pixel. Color images are filtered one channel at a time.
///
/// Even `patch_size` and `range` are rounded up to the next odd value.
///
/// # Examples
///
/// ```rust
/// use nlm_denoise::NLMeansExt;
/// use image::{ImageBuffer, Rgb};
///
/// let mut rgb_image = ImageBuffer::new(10, 10);
/// for (x, y, pixel) in rgb_image.enumerate_pixels_mut() {
///     *pixel = Rgb([100u8, 150, (x * 10 + y) as u8]);
/// }
///
/// let denoised = rgb_image.nl_means(10.0, 3, 7).unwrap();
/// assert_eq!(denoised.dimensions(), (10, 10));
/// ```
pub trait NLMeansExt {
    /// Apply Non-Local Means denoising to the image.
    ///
    /// This consumes the original image.
    ///
    /// # Arguments
    ///
    /// * `h` - Decay parameter; larger values average more aggressively
    /// * `patch_size` - Side of the compared patches
    /// * `range` - Side of the search window
    ///
    /// # Errors
    ///
    /// * `NLMeansError::EmptyPlane` - If the image has zero width or height
    /// * `NLMeansError::AllocationFailure` - If working buffers cannot be allocated
    fn nl_means(self, h: f32, patch_size: u32, range: u32) -> Result<Self, NLMeansError>
    where
        Self: Sized;

    /// Apply Non-Local Means denoising to the image in-place.
    ///
    /// # Errors
    ///
    /// See [`NLMeansExt::nl_means`].
    fn nl_means_mut(
        &mut self,
        h: f32,
        patch_size: u32,
        range: u32,
    ) -> Result<&mut Self, NLMeansError>;
}

/// Denoises planar channels of one image, returning the filtered planes in the same order.
fn denoise_channels_impl(
    format: ImageFormat,
    channels: &[Vec<u8>],
    width: u32,
    height: u32,
    params: &NLMeansParams,
) -> Result<Vec<Vec<u8>>, NLMeansError> {
    let frame = FrameInput::new(
        format,
        channels
            .iter()
            .map(|channel| RawPlane::packed(channel, width, height))
            .collect(),
    );

    let mut ring = FrameRing::new(1);
    ring.push(ColorImage::from_frame(&frame, params.requested_border())?);

    let output = denoise_ring(&ring, params, Backend::default())?;
    Ok(output.into_planes().into_iter().map(|plane| plane.into_raw()).collect())
}

impl NLMeansExt for Image<Luma<u8>> {
    fn nl_means(mut self, h: f32, patch_size: u32, range: u32) -> Result<Self, NLMeansError> {
        self.nl_means_mut(h, patch_size, range)?;
        Ok(self)
    }

    fn nl_means_mut(
        &mut self,
        h: f32,
        patch_size: u32,
        range: u32,
    ) -> Result<&mut Self, NLMeansError> {
        let (width, height) = self.dimensions();
        let params = NLMeansParams::spatial(f64::from(h), patch_size, range);

        let channels = [self.as_raw().clone()];
        let mut planes = denoise_channels_impl(ImageFormat::Mono, &channels, width, height, &params)?;

        if let Some(luma) = planes.pop() {
            self.copy_from_slice(&luma);
        }
        Ok(self)
    }
}

impl NLMeansExt for Image<Rgb<u8>> {
    fn nl_means(mut self, h: f32, patch_size: u32, range: u32) -> Result<Self, NLMeansError> {
        self.nl_means_mut(h, patch_size, range)?;
        Ok(self)
    }

    fn nl_means_mut(
        &mut self,
        h: f32,
        patch_size: u32,
        range: u32,
    ) -> Result<&mut Self, NLMeansError> {
        let (width, height) = self.dimensions();
        let params = NLMeansParams::spatial(f64::from(h), patch_size, range);

        let channels: Vec<Vec<u8>> = (0..3)
            .map(|c| self.pixels().map(|pixel| pixel[c]).collect())
            .collect();
        let planes = denoise_channels_impl(ImageFormat::Rgb, &channels, width, height, &params)?;

        iproduct!(0..height, 0..width).for_each(|(y, x)| {
            let idx = (y * width + x) as usize;
            let pixel = self.get_pixel_mut(x, y);
            for (c, plane) in planes.iter().enumerate() {
                pixel[c] = plane[idx];
            }
        });
        Ok(self)
    }
}
