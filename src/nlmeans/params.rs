/// Smallest patch size and search range a caller is expected to configure.
pub const MIN_WINDOW_SIZE: u32 = 3;

/// Largest patch size and search range a caller is expected to configure.
///
/// The patch size cap also bounds the largest possible patch SSD:
/// `255² · 255²` still fits in the 32-bit integral image.
pub const MAX_WINDOW_SIZE: u32 = 255;

/// Decay parameter range accepted by [`NLMeansParams::clamped`].
pub const MIN_DECAY: f64 = 0.1;
pub const MAX_DECAY: f64 = 100.0;

/// Maximum number of frames the temporal ring may hold.
pub const MAX_TEMPORAL_FRAMES: usize = 32;

const _: () = assert!(
    (MAX_WINDOW_SIZE as u64).pow(2) * 255 * 255 <= u32::MAX as u64,
    "patch SSD must fit in the 32-bit integral image"
);

/// Configuration of the Non-Local Means filter.
///
/// Range validation is left to the caller; use [`NLMeansParams::clamped`] to
/// force every field into its documented range. The engine itself only forces
/// `patch_size` and `range` odd.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NLMeansParams {
    /// Patch width/height, odd, in `[3, 255]`.
    pub patch_size: u32,
    /// Spatial search window width/height, odd, in `[3, 255]`.
    pub range: u32,
    /// Averaging weight decay parameter, in `[0.1, 100.0]`.
    pub h: f64,
    /// Number of frames searched (current frame included), in `[1, 32]`.
    pub temporal_frames: usize,
}

impl Default for NLMeansParams {
    fn default() -> Self {
        Self {
            patch_size: 7,
            range: 3,
            h: 8.0,
            temporal_frames: 2,
        }
    }
}

impl NLMeansParams {
    /// Create parameters for purely spatial filtering of single images.
    #[must_use]
    pub const fn spatial(h: f64, patch_size: u32, range: u32) -> Self {
        Self {
            patch_size,
            range,
            h,
            temporal_frames: 1,
        }
    }

    /// Return a copy with every field clamped into its documented range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            patch_size: self.patch_size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE),
            range: self.range.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE),
            h: if self.h.is_nan() {
                MIN_DECAY
            } else {
                self.h.clamp(MIN_DECAY, MAX_DECAY)
            },
            temporal_frames: self.temporal_frames.clamp(1, MAX_TEMPORAL_FRAMES),
        }
    }

    /// Patch size actually used: odd-forced and capped at [`MAX_WINDOW_SIZE`].
    #[inline]
    #[must_use]
    pub const fn effective_patch_size(&self) -> usize {
        let n = self.patch_size | 1;
        if n > MAX_WINDOW_SIZE {
            MAX_WINDOW_SIZE as usize
        } else {
            n as usize
        }
    }

    /// Search range actually used: odd-forced and capped at [`MAX_WINDOW_SIZE`].
    #[inline]
    #[must_use]
    pub const fn effective_range(&self) -> usize {
        let r = self.range | 1;
        if r > MAX_WINDOW_SIZE {
            MAX_WINDOW_SIZE as usize
        } else {
            r as usize
        }
    }

    /// Ring capacity derived from `temporal_frames`, in `[1, 32]`.
    #[inline]
    #[must_use]
    pub const fn ring_capacity(&self) -> usize {
        if self.temporal_frames == 0 {
            1
        } else if self.temporal_frames > MAX_TEMPORAL_FRAMES {
            MAX_TEMPORAL_FRAMES
        } else {
            self.temporal_frames
        }
    }

    /// Border width requested from each bordered plane: half the search range, rounded up.
    #[inline]
    #[must_use]
    pub const fn requested_border(&self) -> usize {
        self.effective_range().div_ceil(2)
    }
}
