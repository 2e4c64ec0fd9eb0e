/// Number of quantized weight buckets.
pub const WEIGHT_TABLE_SIZE: usize = 128;

/// Weight of the last bucket relative to the first before it is forced to zero.
const CUTOFF_WEIGHT: f64 = 0.0005;

/// Exponential decay lookup mapping a patch SSD to a contribution weight.
///
/// `table[i] = exp(-i / stretch)` with `stretch = 128 / -ln(0.0005)`, so the
/// table spans weights from 1 down to 0.0005; the last entry is forced to 0.
/// An SSD is quantized with `floor(ssd / (n² h²) · stretch)`; indices past the
/// table are negligible and must be skipped by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    table: [f32; WEIGHT_TABLE_SIZE],
    scale: f32,
}

impl WeightTable {
    /// Build the table for decay parameter `h` and patch width `patch_size`.
    #[must_use]
    pub fn new(h: f64, patch_size: usize) -> Self {
        let stretch = WEIGHT_TABLE_SIZE as f64 / -CUTOFF_WEIGHT.ln();
        let patch_area = (patch_size * patch_size) as f64;
        let weight_factor = 1.0 / patch_area / (h * h);

        let mut table: [f32; WEIGHT_TABLE_SIZE] =
            core::array::from_fn(|i| (-(i as f64) / stretch).exp() as f32);
        table[WEIGHT_TABLE_SIZE - 1] = 0.0;

        Self {
            table,
            scale: (weight_factor * stretch) as f32,
        }
    }

    /// Quantized bucket of `ssd`, or `None` past the hard cutoff.
    #[inline]
    #[must_use]
    pub fn index(&self, ssd: u32) -> Option<usize> {
        let position = ssd as f32 * self.scale;
        // NaN (degenerate h) compares false and is treated as past the cutoff.
        (position < WEIGHT_TABLE_SIZE as f32).then_some(position as usize)
    }

    /// Weight for `ssd`, or `None` when the contribution is negligible and must be skipped.
    #[inline]
    #[must_use]
    pub fn lookup(&self, ssd: u32) -> Option<f32> {
        self.index(ssd).map(|index| self.table[index])
    }

    /// Table entries, bucket 0 first.
    #[inline]
    #[must_use]
    pub const fn entries(&self) -> &[f32; WEIGHT_TABLE_SIZE] {
        &self.table
    }

    /// Largest weight in the table, the weight of a zero SSD.
    #[inline]
    #[must_use]
    pub const fn max_weight(&self) -> f32 {
        self.table[0]
    }
}
