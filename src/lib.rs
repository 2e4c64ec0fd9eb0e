//! # nlm-denoise
//!
//! Temporal Non-Local Means denoising for 8-bit image planes and video frames.
//!
//! Every output pixel is a weighted average of the pixels within a search
//! window of the current frame and of up to 31 previous frames. A candidate's
//! weight decays exponentially with the sum of squared differences between the
//! patch around it and the patch around the pixel being filtered. Patch sums
//! come from per-offset integral images, built by either a scalar or a SIMD
//! backend that produce identical tables.
//!
//! - **Streaming**: [`NLMeansEngine`] keeps a bounded ring of bordered frames
//! - **One-shot**: [`denoise_plane`] and [`denoise_plane_into`] filter single planes
//! - **Images**: [`NLMeansExt`] filters `image` buffers in place or by value
//!
//! ## Example Usage
//!
//! ```no_run
//! use nlm_denoise::{FrameInput, ImageFormat, NLMeansEngine, NLMeansExt, NLMeansParams, RawPlane};
//! use imageproc::definitions::Image;
//! use image::Luma;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Video: feed frames in display order
//! let mut engine = NLMeansEngine::new(NLMeansParams {
//!     h: 6.0,
//!     temporal_frames: 3,
//!     ..NLMeansParams::default()
//! });
//! let (y, u, v) = (vec![0u8; 64 * 48], vec![0u8; 32 * 24], vec![0u8; 32 * 24]);
//! let frame = FrameInput::new(
//!     ImageFormat::Yuv420,
//!     vec![
//!         RawPlane::packed(&y, 64, 48),
//!         RawPlane::packed(&u, 32, 24),
//!         RawPlane::packed(&v, 32, 24),
//!     ],
//! );
//! let denoised = engine.process(&frame)?;
//!
//! // Still images
//! let image: Image<Luma<u8>> = Image::new(100, 100);
//! let smoothed = image.nl_means(8.0, 7, 21)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde`: Enables serialization of [`NLMeansParams`], [`ImageFormat`] and [`Backend`] (optional)

mod error;
mod nlmeans;
mod utils;

#[cfg(test)]
mod test_utils;

pub use error::NLMeansError;
pub use nlmeans::{
    Backend, BorderedPlane, ColorImage, DenoisedImage, FrameInput, FrameRing, ImageFormat,
    IntegralBuilder, IntegralImage, MAX_DECAY, MAX_TEMPORAL_FRAMES, MAX_WINDOW_SIZE, MIN_DECAY,
    MIN_WINDOW_SIZE, NLMeansEngine, NLMeansExt, NLMeansParams, Plane, RawPlane, ScalarIntegral,
    VectorIntegral, WEIGHT_TABLE_SIZE, WeightTable, denoise_plane, denoise_plane_into,
    denoise_ring,
};

// Re-export imageproc::definitions::Image for convenience
pub use imageproc::definitions::Image;
