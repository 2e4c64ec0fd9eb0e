//! Internal utility functions for nlm-denoise.
//!
//! Fallible allocation and raw buffer validation shared by the engine modules.

use crate::error::NLMeansError;

/// Allocates a vector of `len` copies of `value` without aborting on OOM.
///
/// # Errors
///
/// `NLMeansError::AllocationFailure` when the allocator refuses the request
/// or the byte size overflows `usize`.
pub fn try_alloc_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, NLMeansError> {
    let bytes = len.saturating_mul(size_of::<T>());
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| NLMeansError::AllocationFailure { bytes })?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Validates that a strided 8-bit plane buffer can hold `width`x`height` samples.
///
/// # Arguments
///
/// * `index` - Plane index, used for error reporting
/// * `data_len` - Length of the caller's buffer
/// * `width` - Visible samples per row
/// * `height` - Number of rows
/// * `stride` - Distance in bytes between row starts
///
/// # Returns
///
/// `Ok(())` if every row lies inside the buffer, otherwise an error
pub fn validate_plane_buffer(
    index: usize,
    data_len: usize,
    width: u32,
    height: u32,
    stride: usize,
) -> Result<(), NLMeansError> {
    if width == 0 || height == 0 {
        return Err(NLMeansError::EmptyPlane { index });
    }

    let invalid = || NLMeansError::InvalidPlane {
        index,
        width,
        height,
        stride,
        len: data_len,
    };

    if stride < width as usize {
        return Err(invalid());
    }

    let required = (height as usize - 1)
        .checked_mul(stride)
        .and_then(|rows| rows.checked_add(width as usize))
        .ok_or_else(invalid)?;

    if data_len < required {
        return Err(invalid());
    }

    Ok(())
}

/// Rounds `value` up to the next multiple of 16.
#[inline]
pub const fn round_up_16(value: usize) -> usize {
    value.div_ceil(16) * 16
}
