use crate::error::NLMeansError;
use crate::nlmeans::format::RawPlane;
use crate::utils::{round_up_16, try_alloc_filled, validate_plane_buffer};

/// An 8-bit plane copied into a padded buffer whose border replicates the edge samples.
///
/// The visible plane starts at an origin offset inside one backing allocation.
/// Any coordinate in `[-border, width + border) x [-border, height + border)`
/// is addressable and yields the nearest edge sample outside the visible area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderedPlane {
    data: Vec<u8>,
    width: usize,
    height: usize,
    border: usize,
    stride: usize,
}

impl BorderedPlane {
    /// Copy a raw plane into a new bordered buffer.
    ///
    /// `requested_border` is rounded up to the next multiple of 16.
    ///
    /// # Errors
    ///
    /// * `NLMeansError::EmptyPlane` / `NLMeansError::InvalidPlane` - If the raw buffer does not match its geometry
    /// * `NLMeansError::AllocationFailure` - If the padded buffer cannot be allocated
    pub fn extend(raw: &RawPlane<'_>, requested_border: usize) -> Result<Self, NLMeansError> {
        Self::extend_plane(0, raw, requested_border)
    }

    pub(crate) fn extend_plane(
        index: usize,
        raw: &RawPlane<'_>,
        requested_border: usize,
    ) -> Result<Self, NLMeansError> {
        validate_plane_buffer(index, raw.data.len(), raw.width, raw.height, raw.stride)?;

        let width = raw.width as usize;
        let height = raw.height as usize;
        let border = round_up_16(requested_border.min(usize::MAX / 4));
        let padding = 2 * border;
        let oversized = NLMeansError::AllocationFailure { bytes: usize::MAX };
        let stride = width.checked_add(padding).ok_or(oversized.clone())?;
        let total_height = height.checked_add(padding).ok_or(oversized.clone())?;
        let len = stride.checked_mul(total_height).ok_or(oversized)?;

        let mut data = try_alloc_filled(len, 0u8)?;

        for y in 0..height {
            let start = (y + border) * stride;
            replicate_row_impl(&mut data[start..start + stride], raw.row(y), border);
        }

        let first_row = border * stride;
        let last_row = (border + height - 1) * stride;
        for k in 0..border {
            data.copy_within(first_row..first_row + stride, k * stride);
            data.copy_within(last_row..last_row + stride, (border + height + k) * stride);
        }

        Ok(Self {
            data,
            width,
            height,
            border,
            stride,
        })
    }

    /// Visible width in samples.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Visible height in rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Border width on every side, a multiple of 16.
    #[inline]
    #[must_use]
    pub const fn border(&self) -> usize {
        self.border
    }

    /// Distance between row starts in the backing buffer.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    fn index_of(&self, x: isize, y: isize) -> Option<usize> {
        let border = self.border as isize;
        let bx = x.checked_add(border)?;
        let by = y.checked_add(border)?;
        if bx < 0 || by < 0 {
            return None;
        }
        let (bx, by) = (bx as usize, by as usize);
        (bx < self.stride && by < self.height + 2 * self.border).then(|| by * self.stride + bx)
    }

    /// Sample at `(x, y)`, or `None` outside the bordered area.
    #[inline]
    #[must_use]
    pub fn get(&self, x: isize, y: isize) -> Option<u8> {
        self.index_of(x, y).map(|idx| self.data[idx])
    }

    /// Sample at `(x, y)` without bounds checking.
    ///
    /// # Safety
    ///
    /// `x` must lie in `[-border, width + border)` and `y` in `[-border, height + border)`.
    #[inline]
    #[must_use]
    pub unsafe fn get_unchecked(&self, x: isize, y: isize) -> u8 {
        let idx = (y + self.border as isize) as usize * self.stride
            + (x + self.border as isize) as usize;
        debug_assert!(idx < self.data.len());
        // SAFETY: the caller keeps (x, y) inside the bordered area.
        unsafe { *self.data.get_unchecked(idx) }
    }

    /// `len` consecutive samples of row `y` starting at column `x`.
    ///
    /// # Panics
    ///
    /// Panics if the span leaves the bordered area.
    #[inline]
    #[must_use]
    pub fn span(&self, x: isize, y: isize, len: usize) -> &[u8] {
        let start = self
            .index_of(x, y)
            .expect("span start outside the bordered plane");
        let row_end = start - (start % self.stride) + self.stride;
        assert!(start + len <= row_end, "span crosses the bordered row end");
        &self.data[start..start + len]
    }

    /// Visible samples of row `y`.
    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &[u8] {
        self.span(0, y as isize, self.width)
    }

    /// Whether shifted access by up to `offset` samples in any direction stays in the border.
    #[inline]
    #[must_use]
    pub const fn covers_offset(&self, offset: usize) -> bool {
        offset <= self.border
    }
}

/// Fills one padded row: left border, copied interior, right border.
fn replicate_row_impl(dst: &mut [u8], src: &[u8], border: usize) {
    let width = src.len();
    dst[..border].fill(src[0]);
    dst[border..border + width].copy_from_slice(src);
    dst[border + width..].fill(src[width - 1]);
}

/// A tightly packed 8-bit output plane (`stride == width`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Plane {
    pub(crate) fn allocate(width: u32, height: u32) -> Result<Self, NLMeansError> {
        let data = try_alloc_filled(width as usize * height as usize, 0u8)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Width in samples.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Sample at `(x, y)`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        (x < self.width && y < self.height)
            .then(|| self.data[y as usize * self.width as usize + x as usize])
    }

    /// Row `y` of the plane.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    /// All samples, row-major.
    #[inline]
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_raw(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Borrow as a raw plane, e.g. to feed the result into another filter pass.
    #[must_use]
    pub fn as_raw_plane(&self) -> RawPlane<'_> {
        RawPlane::packed(&self.data, self.width, self.height)
    }

    /// Consume the plane, returning its samples.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}
