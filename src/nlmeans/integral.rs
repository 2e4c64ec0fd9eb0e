use wide::{i16x8, i32x8, u8x16, u32x8};

use crate::error::NLMeansError;
use crate::nlmeans::plane::BorderedPlane;
use crate::utils::try_alloc_filled;

/// Summed-area table of squared differences between two planes.
///
/// Cell `(x, y)` holds `Σ_{x' <= x, y' <= y} (reference[x', y'] - comparison[x' + dx, y' + dy])²`
/// in wrapping 32-bit arithmetic. Row and column `-1` are zero sentinels, so any
/// box sum is four lookups. Only differences of cells are meaningful; they are
/// exact as long as the true box sum fits in 32 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegralImage {
    data: Vec<u32>,
    width: usize,
    height: usize,
}

impl IntegralImage {
    /// Allocate a zeroed table for a `width`x`height` plane.
    ///
    /// # Errors
    ///
    /// `NLMeansError::AllocationFailure` if the table cannot be allocated.
    pub fn new(width: usize, height: usize) -> Result<Self, NLMeansError> {
        let data = try_alloc_filled((width + 1) * (height + 1), 0u32)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Re-dimension the table, growing the allocation only if needed.
    ///
    /// Contents are unspecified until the next build.
    ///
    /// # Errors
    ///
    /// `NLMeansError::AllocationFailure` if growing the table fails.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), NLMeansError> {
        let len = (width + 1) * (height + 1);
        if len > self.data.len() {
            let additional = len - self.data.len();
            self.data
                .try_reserve_exact(additional)
                .map_err(|_| NLMeansError::AllocationFailure {
                    bytes: len.saturating_mul(size_of::<u32>()),
                })?;
        }
        self.data.resize(len, 0);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Width of the covered plane.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height of the covered plane.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    const fn stride(&self) -> usize {
        self.width + 1
    }

    /// Row `y` in `[-1, height)`, starting with the sentinel column.
    ///
    /// Index `k` of the returned slice is column `k - 1`.
    #[inline]
    #[must_use]
    pub fn row(&self, y: isize) -> &[u32] {
        let start = (y + 1) as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    /// Cell at `(x, y)` with both coordinates in `[-1, dimension)`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: isize, y: isize) -> Option<u32> {
        let in_range = |v: isize, limit: usize| v >= -1 && v < limit as isize;
        (in_range(x, self.width) && in_range(y, self.height))
            .then(|| self.row(y)[(x + 1) as usize])
    }

    /// Sum over the inclusive rectangle `[x0, x1] x [y0, y1]`.
    #[inline]
    #[must_use]
    pub fn box_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u32 {
        let top = self.row(y0 as isize - 1);
        let bottom = self.row(y1 as isize);
        bottom[x1 + 1]
            .wrapping_sub(bottom[x0])
            .wrapping_sub(top[x1 + 1])
            .wrapping_add(top[x0])
    }

    /// Previous row (read) and row `y` (write), both without the sentinel column.
    #[inline]
    fn rows_for_update(&mut self, y: usize) -> (&[u32], &mut [u32]) {
        let stride = self.stride();
        let (above, rest) = self.data.split_at_mut((y + 1) * stride);
        let previous = &above[y * stride + 1..];
        let current = &mut rest[..stride];
        current[0] = 0;
        (previous, &mut current[1..])
    }

    fn clear_sentinel_row(&mut self) {
        let stride = self.stride();
        self.data[..stride].fill(0);
    }
}

/// Builds the squared-difference integral image for one spatial offset.
///
/// Every implementation must produce bit-identical tables for identical inputs.
pub trait IntegralBuilder {
    /// Fill `integral` for `reference` against `comparison` shifted by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// `NLMeansError::IncompatibleFrame` if a plane does not match the table
    /// size (`index` 0 for `reference`, 1 for `comparison`) or the shifted
    /// access would leave `comparison`'s border (`index` 1). The table is left
    /// untouched in that case.
    fn build(
        &self,
        integral: &mut IntegralImage,
        reference: &BorderedPlane,
        comparison: &BorderedPlane,
        dx: isize,
        dy: isize,
    ) -> Result<(), NLMeansError>;
}

fn check_geometry_impl(
    integral: &IntegralImage,
    reference: &BorderedPlane,
    comparison: &BorderedPlane,
    dx: isize,
    dy: isize,
) -> Result<(), NLMeansError> {
    let size = (integral.width(), integral.height());
    if (reference.width(), reference.height()) != size {
        return Err(NLMeansError::IncompatibleFrame { index: 0 });
    }
    let reachable =
        comparison.covers_offset(dx.unsigned_abs()) && comparison.covers_offset(dy.unsigned_abs());
    if (comparison.width(), comparison.height()) != size || !reachable {
        return Err(NLMeansError::IncompatibleFrame { index: 1 });
    }
    Ok(())
}

/// Scalar recurrence for columns `from..` of one row, continuing `row_sum`.
#[inline]
fn scalar_row_impl(
    current: &[u8],
    shifted: &[u8],
    above: &[u32],
    out: &mut [u32],
    from: usize,
    mut row_sum: u32,
) {
    for x in from..out.len() {
        let diff = i32::from(current[x]) - i32::from(shifted[x]);
        row_sum = row_sum.wrapping_add((diff * diff) as u32);
        out[x] = row_sum.wrapping_add(above[x]);
    }
}

/// Straightforward prefix-sum recurrence, one sample at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarIntegral;

impl IntegralBuilder for ScalarIntegral {
    fn build(
        &self,
        integral: &mut IntegralImage,
        reference: &BorderedPlane,
        comparison: &BorderedPlane,
        dx: isize,
        dy: isize,
    ) -> Result<(), NLMeansError> {
        check_geometry_impl(integral, reference, comparison, dx, dy)?;
        let width = integral.width();

        integral.clear_sentinel_row();
        for y in 0..integral.height() {
            let current = reference.row(y);
            let shifted = comparison.span(dx, y as isize + dy, width);
            let (above, out) = integral.rows_for_update(y);
            scalar_row_impl(current, shifted, above, out, 0, 0);
        }
        Ok(())
    }
}

const LANES: usize = 8;
const BLOCK: usize = 2 * LANES;

/// Backend on the portable `wide` vector types.
///
/// Sixteen samples per step are loaded as `u8x16`, widened and differenced in
/// `i16x8` halves, squared into `i32x8`, and added to the row above as `u32x8`.
/// Leftover columns fall back to the scalar recurrence. Integer lanes wrap,
/// which keeps the output identical to [`ScalarIntegral`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorIntegral;

/// Inclusive running sum of `squares`, seeded with and advancing `row_sum`.
///
/// `wide` has no lane shifts, so the eight-step scan runs on the extracted lanes.
#[inline(always)]
fn running_sum_impl(squares: i32x8, row_sum: &mut u32) -> u32x8 {
    let mut lanes = squares.to_array().map(|square| square as u32);
    for lane in &mut lanes {
        *row_sum = row_sum.wrapping_add(*lane);
        *lane = *row_sum;
    }
    u32x8::from(lanes)
}

impl IntegralBuilder for VectorIntegral {
    fn build(
        &self,
        integral: &mut IntegralImage,
        reference: &BorderedPlane,
        comparison: &BorderedPlane,
        dx: isize,
        dy: isize,
    ) -> Result<(), NLMeansError> {
        check_geometry_impl(integral, reference, comparison, dx, dy)?;
        let width = integral.width();

        integral.clear_sentinel_row();
        for y in 0..integral.height() {
            let current = reference.row(y);
            let shifted = comparison.span(dx, y as isize + dy, width);
            let (above, out) = integral.rows_for_update(y);

            let (current_blocks, _) = current.as_chunks::<BLOCK>();
            let (shifted_blocks, _) = shifted.as_chunks::<BLOCK>();
            let (above_blocks, _) = above.as_chunks::<BLOCK>();
            let (out_blocks, _) = out.as_chunks_mut::<BLOCK>();
            let vector_width = current_blocks.len() * BLOCK;

            let mut row_sum = 0u32;
            let blocks = current_blocks
                .iter()
                .zip(shifted_blocks)
                .zip(above_blocks.iter().zip(out_blocks.iter_mut()));
            for ((&a, &b), (above_block, out_block)) in blocks {
                let (a, b) = (u8x16::from(a), u8x16::from(b));
                let halves = [
                    i16x8::from_u8x16_low(a) - i16x8::from_u8x16_low(b),
                    i16x8::from_u8x16_high(a) - i16x8::from_u8x16_high(b),
                ];

                let (above_lanes, _) = above_block.as_chunks::<LANES>();
                let (out_lanes, _) = out_block.as_chunks_mut::<LANES>();
                for ((diff, &above), out) in halves.into_iter().zip(above_lanes).zip(out_lanes) {
                    let row_sums = running_sum_impl(diff.mul_widen(diff), &mut row_sum);
                    *out = (row_sums + u32x8::from(above)).to_array();
                }
            }

            scalar_row_impl(current, shifted, above, out, vector_width, row_sum);
        }
        Ok(())
    }
}

/// Integral-image implementation selected by the caller.
///
/// Selection is explicit configuration; nothing is probed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    /// Reference implementation
    Scalar,
    /// Sixteen-sample `wide` implementation
    #[default]
    Vector,
}

impl Backend {
    /// The builder implementing this backend.
    #[must_use]
    pub fn builder(self) -> &'static dyn IntegralBuilder {
        match self {
            Self::Scalar => &ScalarIntegral,
            Self::Vector => &VectorIntegral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlmeans::format::RawPlane;
    use crate::test_utils::{bordered, bordered_from_fn};
    use itertools::iproduct;
    use proptest::prelude::*;

    fn brute_force_box_sum(
        reference: &BorderedPlane,
        comparison: &BorderedPlane,
        (dx, dy): (isize, isize),
        (x0, y0, x1, y1): (usize, usize, usize, usize),
    ) -> u64 {
        iproduct!(y0..=y1, x0..=x1)
            .map(|(y, x)| {
                let a = i64::from(reference.get(x as isize, y as isize).unwrap());
                let b = i64::from(comparison.get(x as isize + dx, y as isize + dy).unwrap());
                ((a - b) * (a - b)) as u64
            })
            .sum()
    }

    #[test]
    fn build_with_identical_planes_and_zero_shift_returns_all_zero() {
        let plane = bordered_from_fn(13, 9, 1, |x, y| ((x * 31 + y * 17) % 256) as u8);
        for backend in [Backend::Scalar, Backend::Vector] {
            let mut integral = IntegralImage::new(13, 9).unwrap();
            backend.builder().build(&mut integral, &plane, &plane, 0, 0).unwrap();
            assert!(
                iproduct!(-1..9isize, -1..13isize).all(|(y, x)| integral.get(x, y) == Some(0)),
                "{backend:?} produced a non-zero cell"
            );
        }
    }

    #[test]
    fn box_sum_with_single_sample_equals_squared_difference() {
        let reference = bordered_from_fn(6, 5, 1, |x, y| (x * 40 + y) as u8);
        let comparison = bordered_from_fn(6, 5, 1, |x, y| (200 - x * 7 - y * 11) as u8);
        let mut integral = IntegralImage::new(6, 5).unwrap();
        ScalarIntegral.build(&mut integral, &reference, &comparison, 1, -1).unwrap();

        iproduct!(0..5usize, 0..6usize).for_each(|(y, x)| {
            let a = i32::from(reference.get(x as isize, y as isize).unwrap());
            let b = i32::from(comparison.get(x as isize + 1, y as isize - 1).unwrap());
            assert_eq!(integral.box_sum(x, y, x, y), ((a - b) * (a - b)) as u32);
        });
    }

    #[test]
    fn box_sum_with_shifted_planes_matches_brute_force() {
        let reference = bordered_from_fn(19, 11, 2, |x, y| ((x * x + 3 * y) % 256) as u8);
        let comparison = bordered_from_fn(19, 11, 2, |x, y| ((7 * x + y * y) % 256) as u8);
        let mut integral = IntegralImage::new(19, 11).unwrap();
        ScalarIntegral.build(&mut integral, &reference, &comparison, -2, 1).unwrap();

        for rect in [(0, 0, 18, 10), (3, 2, 7, 6), (10, 0, 10, 10), (0, 5, 18, 5)] {
            let expected = brute_force_box_sum(&reference, &comparison, (-2, 1), rect);
            let (x0, y0, x1, y1) = rect;
            assert_eq!(u64::from(integral.box_sum(x0, y0, x1, y1)), expected);
        }
    }

    #[test]
    fn box_sum_with_wrapped_cells_recovers_largest_patch_sum() {
        // 255² per sample overflows the cumulative cells, but not a 255x255 box.
        let reference = bordered(&[255u8; 300 * 300], 300, 300, 1);
        let comparison = bordered(&[0u8; 300 * 300], 300, 300, 1);
        for backend in [Backend::Scalar, Backend::Vector] {
            let mut integral = IntegralImage::new(300, 300).unwrap();
            backend
                .builder()
                .build(&mut integral, &reference, &comparison, 0, 0).unwrap();
            assert_eq!(integral.box_sum(20, 30, 274, 284), 255 * 255 * 255 * 255);
            assert_eq!(integral.box_sum(0, 0, 0, 0), 255 * 255);
        }
    }

    #[test]
    fn resize_with_smaller_plane_reuses_table() {
        let mut integral = IntegralImage::new(16, 16).unwrap();
        integral.resize(5, 3).unwrap();
        assert_eq!((integral.width(), integral.height()), (5, 3));
        assert_eq!(integral.row(-1).len(), 6);

        let plane = bordered_from_fn(5, 3, 1, |x, _| x as u8);
        let other = bordered_from_fn(5, 3, 1, |_, y| y as u8);
        VectorIntegral.build(&mut integral, &plane, &other, 0, 0).unwrap();
        assert_eq!(integral.get(4, 2), Some(scalar_reference(&plane, &other)));
    }

    fn scalar_reference(a: &BorderedPlane, b: &BorderedPlane) -> u32 {
        let mut integral = IntegralImage::new(a.width(), a.height()).unwrap();
        ScalarIntegral.build(&mut integral, a, b, 0, 0).unwrap();
        integral.get(a.width() as isize - 1, a.height() as isize - 1).unwrap()
    }

    #[test]
    fn build_with_offset_beyond_border_returns_error() {
        let data = [0u8; 4];
        let plane = BorderedPlane::extend(&RawPlane::packed(&data, 2, 2), 1).unwrap();
        let mut integral = IntegralImage::new(2, 2).unwrap();
        for backend in [Backend::Scalar, Backend::Vector] {
            assert_eq!(
                backend.builder().build(&mut integral, &plane, &plane, 17, 0),
                Err(NLMeansError::IncompatibleFrame { index: 1 })
            );
            assert_eq!(
                backend.builder().build(&mut integral, &plane, &plane, 0, -17),
                Err(NLMeansError::IncompatibleFrame { index: 1 })
            );
        }
    }

    #[test]
    fn build_with_mismatched_planes_returns_error_and_keeps_table() {
        let small = bordered(&[1u8; 16], 4, 4, 1);
        let large = bordered(&[2u8; 25], 5, 5, 1);
        let mut integral = IntegralImage::new(4, 4).unwrap();
        ScalarIntegral.build(&mut integral, &small, &small, 0, 0).unwrap();
        let before = integral.clone();

        assert_eq!(
            ScalarIntegral.build(&mut integral, &small, &large, 0, 0),
            Err(NLMeansError::IncompatibleFrame { index: 1 })
        );
        assert_eq!(
            VectorIntegral.build(&mut integral, &large, &small, 0, 0),
            Err(NLMeansError::IncompatibleFrame { index: 0 })
        );
        assert_eq!(integral, before);
    }

    #[test]
    fn build_with_wide_rows_matches_scalar_across_block_tail() {
        // 16-sample blocks plus a 7-sample tail.
        let reference = bordered_from_fn(39, 3, 16, |x, y| (x * 13 + y * 101) as u8);
        let comparison = bordered_from_fn(39, 3, 16, |x, y| (255 - x * 5 - y) as u8);
        let mut scalar = IntegralImage::new(39, 3).unwrap();
        let mut vector = IntegralImage::new(39, 3).unwrap();
        ScalarIntegral.build(&mut scalar, &reference, &comparison, -3, 2).unwrap();
        VectorIntegral.build(&mut vector, &reference, &comparison, -3, 2).unwrap();
        assert_eq!(scalar, vector);
    }

    fn plane_pair_strategy() -> impl Strategy<Value = (usize, usize, Vec<u8>, Vec<u8>, isize, isize)>
    {
        (1usize..70, 1usize..24).prop_flat_map(|(width, height)| {
            (
                Just(width),
                Just(height),
                prop::collection::vec(any::<u8>(), width * height),
                prop::collection::vec(any::<u8>(), width * height),
                -16isize..=16,
                -16isize..=16,
            )
        })
    }

    proptest! {
        #[test]
        fn vector_backend_matches_scalar_bit_for_bit(
            (width, height, reference, comparison, dx, dy) in plane_pair_strategy()
        ) {
            let reference = bordered(&reference, width, height, 16);
            let comparison = bordered(&comparison, width, height, 16);

            let mut scalar = IntegralImage::new(width, height).unwrap();
            let mut vector = IntegralImage::new(width, height).unwrap();
            ScalarIntegral.build(&mut scalar, &reference, &comparison, dx, dy).unwrap();
            VectorIntegral.build(&mut vector, &reference, &comparison, dx, dy).unwrap();

            prop_assert_eq!(scalar, vector);
        }
    }
}
