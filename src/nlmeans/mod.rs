//! Temporal Non-Local Means denoising.

mod color;
mod engine;
mod ext;
mod format;
mod frame_ring;
mod integral;
mod params;
mod plane;
mod weight_table;

pub use color::{ColorImage, DenoisedImage};
pub use engine::{NLMeansEngine, denoise_plane, denoise_plane_into, denoise_ring};
pub use ext::NLMeansExt;
pub use format::{FrameInput, ImageFormat, RawPlane};
pub use frame_ring::FrameRing;
pub use integral::{Backend, IntegralBuilder, IntegralImage, ScalarIntegral, VectorIntegral};
pub use params::{
    MAX_DECAY, MAX_TEMPORAL_FRAMES, MAX_WINDOW_SIZE, MIN_DECAY, MIN_WINDOW_SIZE, NLMeansParams,
};
pub use plane::{BorderedPlane, Plane};
pub use weight_table::{WEIGHT_TABLE_SIZE, WeightTable};
