use thiserror::Error;

use crate::nlmeans::ImageFormat;

/// Errors produced by the Non-Local Means engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NLMeansError {
    /// A working or output buffer could not be allocated.
    #[error("Failed to allocate {bytes} bytes for NL-Means buffers")]
    AllocationFailure { bytes: usize },

    /// A raw input plane is too short for its declared geometry.
    #[error(
        "Plane {index}: buffer of {len} bytes cannot hold {width}x{height} samples with stride {stride}"
    )]
    InvalidPlane {
        index: usize,
        width: u32,
        height: u32,
        stride: usize,
        len: usize,
    },

    /// A raw input plane has zero width or height.
    #[error("Plane {index}: dimensions must be non-zero")]
    EmptyPlane { index: usize },

    /// A frame searched alongside the reference has a different geometry,
    /// lacks a plane, or its border is too narrow for the search range.
    #[error("Frame {index} is incompatible with the reference frame")]
    IncompatibleFrame { index: usize },

    /// No frame was supplied to search.
    #[error("At least one frame is required")]
    NoFrames,

    /// The number of planes does not match the image format.
    #[error("Format {format:?} expects {expected} planes, got {actual}")]
    PlaneCountMismatch {
        format: ImageFormat,
        expected: usize,
        actual: usize,
    },
}
