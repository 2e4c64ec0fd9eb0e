use std::time::Instant;

use imageproc::definitions::Clamp;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::error::NLMeansError;
use crate::nlmeans::color::{ColorImage, DenoisedImage};
use crate::nlmeans::format::FrameInput;
use crate::nlmeans::frame_ring::FrameRing;
use crate::nlmeans::integral::{Backend, IntegralImage};
use crate::nlmeans::params::NLMeansParams;
use crate::nlmeans::plane::{BorderedPlane, Plane};
use crate::nlmeans::weight_table::WeightTable;
use crate::utils::{try_alloc_filled, validate_plane_buffer};

/// Weighted sums collected for one output pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PixelSum {
    weight_sum: f32,
    pixel_sum: f32,
}

/// Integral image and accumulator reused across the planes of one frame.
struct Workspace {
    integral: IntegralImage,
    accumulator: Vec<PixelSum>,
}

impl Workspace {
    fn new(width: usize, height: usize) -> Result<Self, NLMeansError> {
        Ok(Self {
            integral: IntegralImage::new(width, height)?,
            accumulator: try_alloc_filled(width * height, PixelSum::default())?,
        })
    }

    /// Shape both buffers for a `width`x`height` plane and zero the accumulator.
    fn prepare(&mut self, width: usize, height: usize) -> Result<(), NLMeansError> {
        self.integral.resize(width, height)?;

        let len = width * height;
        self.accumulator.clear();
        self.accumulator
            .try_reserve_exact(len)
            .map_err(|_| NLMeansError::AllocationFailure {
                bytes: len.saturating_mul(size_of::<PixelSum>()),
            })?;
        self.accumulator.resize(len, PixelSum::default());
        Ok(())
    }

    /// Denoise `frames[0]` against every frame of `frames`, writing into `out`.
    fn denoise(
        &mut self,
        frames: &[&BorderedPlane],
        params: &NLMeansParams,
        backend: Backend,
        out: &mut [u8],
        out_stride: usize,
    ) -> Result<(), NLMeansError> {
        let reference = check_frames_impl(frames, params)?;
        let (width, height) = (reference.width(), reference.height());
        validate_plane_buffer(0, out.len(), width as u32, height as u32, out_stride)?;

        self.prepare(width, height)?;

        let n = params.effective_patch_size();
        let r2 = (params.effective_range() / 2) as isize;
        let table = WeightTable::new(params.h, n);
        let builder = backend.builder();

        if width >= n && height >= n {
            for frame in frames {
                for dy in -r2..=r2 {
                    for dx in -r2..=r2 {
                        builder.build(&mut self.integral, reference, frame, dx, dy)?;
                        accumulate_pass_impl(
                            &self.integral,
                            &table,
                            frame,
                            &mut self.accumulator,
                            n,
                            (dx, dy),
                        );
                    }
                }
            }
        }

        write_output_impl(reference, &self.accumulator, n, out, out_stride);
        Ok(())
    }
}

/// Checks that every frame matches the reference and has room for the search range.
fn check_frames_impl<'a>(
    frames: &[&'a BorderedPlane],
    params: &NLMeansParams,
) -> Result<&'a BorderedPlane, NLMeansError> {
    let (&reference, _) = frames.split_first().ok_or(NLMeansError::NoFrames)?;
    let r2 = params.effective_range() / 2;

    frames.iter().enumerate().try_for_each(|(index, frame)| {
        let compatible = frame.width() == reference.width()
            && frame.height() == reference.height()
            && frame.covers_offset(r2);
        if compatible {
            Ok(())
        } else {
            Err(NLMeansError::IncompatibleFrame { index })
        }
    })?;

    Ok(reference)
}

/// Adds the contributions of one `(frame, offset)` pass to the accumulator.
///
/// Each patch anchored at `(x, y)` contributes to its center pixel only, so
/// rows are independent and split across the rayon pool.
fn accumulate_pass_impl(
    integral: &IntegralImage,
    table: &WeightTable,
    frame: &BorderedPlane,
    accumulator: &mut [PixelSum],
    n: usize,
    (dx, dy): (isize, isize),
) {
    let (width, height) = (integral.width(), integral.height());
    let n2 = n / 2;

    accumulator[n2 * width..(height - n2) * width]
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let top = integral.row(y as isize - 1);
            let bottom = integral.row((y + n - 1) as isize);
            let sample_y = (y + n2) as isize + dy;

            for x in 0..=width - n {
                let diff = bottom[x + n]
                    .wrapping_sub(bottom[x])
                    .wrapping_sub(top[x + n])
                    .wrapping_add(top[x]);

                let Some(weight) = table.lookup(diff) else {
                    continue;
                };

                let xc = x + n2;
                // SAFETY: the center lies inside the plane and |dx|, |dy| are
                // within the border checked by check_frames_impl.
                let sample = unsafe { frame.get_unchecked(xc as isize + dx, sample_y) };

                let cell = &mut row[xc];
                cell.weight_sum += weight;
                cell.pixel_sum += weight * f32::from(sample);
            }
        });
}

/// Copies the reference into `out`, then overwrites the interior with the weighted averages.
fn write_output_impl(
    reference: &BorderedPlane,
    accumulator: &[PixelSum],
    n: usize,
    out: &mut [u8],
    out_stride: usize,
) {
    let (width, height) = (reference.width(), reference.height());
    let n2 = n / 2;

    for y in 0..height {
        out[y * out_stride..y * out_stride + width].copy_from_slice(reference.row(y));
    }

    if width < n || height < n {
        return;
    }

    let mut unweighted = 0usize;
    for y in n2..height - n2 {
        let sums = &accumulator[y * width..(y + 1) * width];
        let out_row = &mut out[y * out_stride..y * out_stride + width];
        for x in n2..width - n2 {
            let PixelSum {
                weight_sum,
                pixel_sum,
            } = sums[x];
            if weight_sum > 0.0 {
                out_row[x] = <u8 as Clamp<f32>>::clamp(pixel_sum / weight_sum);
            } else {
                unweighted += 1;
            }
        }
    }

    if unweighted > 0 {
        warn!(
            pixels = unweighted,
            "interior pixels received no weight; kept reference samples"
        );
    }
}

/// Denoise the first frame of `frames` into a caller-provided buffer.
///
/// `frames[0]` is the reference (newest) plane; every frame is searched over
/// the full spatial range. Pixels closer than half a patch to an edge are
/// copied from the reference unchanged.
///
/// # Errors
///
/// * `NLMeansError::NoFrames` - If `frames` is empty
/// * `NLMeansError::IncompatibleFrame` - If a frame differs in size or has too narrow a border
/// * `NLMeansError::InvalidPlane` - If `out` cannot hold the plane with `out_stride`
/// * `NLMeansError::AllocationFailure` - If working buffers cannot be allocated
pub fn denoise_plane_into(
    frames: &[&BorderedPlane],
    params: &NLMeansParams,
    backend: Backend,
    out: &mut [u8],
    out_stride: usize,
) -> Result<(), NLMeansError> {
    let reference = check_frames_impl(frames, params)?;
    let mut workspace = Workspace::new(reference.width(), reference.height())?;
    workspace.denoise(frames, params, backend, out, out_stride)
}

/// Denoise the first frame of `frames` into a new plane.
///
/// # Errors
///
/// See [`denoise_plane_into`].
pub fn denoise_plane(
    frames: &[&BorderedPlane],
    params: &NLMeansParams,
    backend: Backend,
) -> Result<Plane, NLMeansError> {
    let reference = check_frames_impl(frames, params)?;
    let mut output = Plane::allocate(reference.width() as u32, reference.height() as u32)?;
    let stride = output.width() as usize;
    denoise_plane_into(frames, params, backend, output.as_mut_raw(), stride)?;
    Ok(output)
}

/// Denoise `frames[0]` plane by plane, searching every frame of `frames`.
fn denoise_frames_impl(
    frames: &[&ColorImage],
    params: &NLMeansParams,
    backend: Backend,
) -> Result<DenoisedImage, NLMeansError> {
    let (&reference, _) = frames.split_first().ok_or(NLMeansError::NoFrames)?;
    let mut output = DenoisedImage::allocate_for(reference)?;

    let (max_width, max_height) = reference
        .planes()
        .fold((0, 0), |(w, h), (_, plane)| {
            (w.max(plane.width()), h.max(plane.height()))
        });
    let mut workspace = Workspace::new(max_width, max_height)?;

    for ((plane_index, _), out) in reference.planes().zip(output.planes_mut()) {
        let planes = frames
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                frame
                    .plane(plane_index)
                    .ok_or(NLMeansError::IncompatibleFrame { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stride = out.width() as usize;
        workspace.denoise(&planes, params, backend, out.as_mut_raw(), stride)?;
    }

    Ok(output)
}

/// Denoise the newest frame of `ring`, searching every frame it currently holds.
///
/// # Errors
///
/// * `NLMeansError::NoFrames` - If the ring is empty
/// * `NLMeansError::IncompatibleFrame` - If the ring mixes frame geometries
/// * `NLMeansError::AllocationFailure` - If working or output buffers cannot be allocated
pub fn denoise_ring(
    ring: &FrameRing,
    params: &NLMeansParams,
    backend: Backend,
) -> Result<DenoisedImage, NLMeansError> {
    let frames = ring.iter().collect::<Vec<_>>();
    denoise_frames_impl(&frames, params, backend)
}

/// Temporal Non-Local Means filter over a stream of frames.
///
/// Each call to [`NLMeansEngine::process`] takes a bordered copy of the input,
/// denoises it against itself and up to `temporal_frames - 1` previous frames,
/// and keeps the copy in the engine's frame ring for later calls.
///
/// # Examples
///
/// ```rust
/// use nlm_denoise::{FrameInput, NLMeansEngine, NLMeansParams, RawPlane};
///
/// let luma = vec![128u8; 16 * 16];
/// let mut engine = NLMeansEngine::new(NLMeansParams::default());
///
/// for _ in 0..3 {
///     let frame = FrameInput::mono(RawPlane::packed(&luma, 16, 16));
///     let denoised = engine.process(&frame).unwrap();
///     assert_eq!(denoised.planes()[0].as_raw(), luma.as_slice());
/// }
/// assert_eq!(engine.ring().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct NLMeansEngine {
    params: NLMeansParams,
    backend: Backend,
    ring: FrameRing,
}

impl NLMeansEngine {
    /// Create an engine using the default (vector) integral backend.
    #[must_use]
    pub fn new(params: NLMeansParams) -> Self {
        Self::with_backend(params, Backend::default())
    }

    /// Create an engine using an explicitly chosen integral backend.
    #[must_use]
    pub fn with_backend(params: NLMeansParams, backend: Backend) -> Self {
        Self {
            ring: FrameRing::new(params.ring_capacity()),
            params,
            backend,
        }
    }

    /// Filter parameters.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &NLMeansParams {
        &self.params
    }

    /// Integral image backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Frames retained from previous calls, newest first.
    #[inline]
    #[must_use]
    pub const fn ring(&self) -> &FrameRing {
        &self.ring
    }

    /// Drop every retained frame, starting a new temporal sequence.
    pub fn reset(&mut self) {
        self.ring.clear();
    }

    /// Denoise one frame of the stream.
    ///
    /// The frame ring is only updated once the output has been produced, so a
    /// failed call leaves the engine exactly as it was. A frame whose format
    /// or geometry differs from the retained frames starts a new sequence.
    ///
    /// # Errors
    ///
    /// * Input validation errors from [`FrameInput::validate`]
    /// * `NLMeansError::AllocationFailure` - If bordered, working, or output buffers cannot be allocated
    pub fn process(&mut self, frame: &FrameInput<'_>) -> Result<DenoisedImage, NLMeansError> {
        let start = Instant::now();
        let image = ColorImage::from_frame(frame, self.params.requested_border())?;

        let restart = self
            .ring
            .newest()
            .is_some_and(|newest| !newest.is_compatible_with(&image));

        let history = if restart { 0 } else { self.ring.capacity() - 1 };
        let frames = std::iter::once(&image)
            .chain(self.ring.iter().take(history))
            .collect::<Vec<_>>();
        let searched = frames.len();

        let output = denoise_frames_impl(&frames, &self.params, self.backend)?;

        if restart {
            debug!(
                dropped = self.ring.len(),
                "frame geometry changed; restarting temporal sequence"
            );
            self.ring.clear();
        }
        if self.ring.push(image).is_some() {
            trace!("released oldest frame from the temporal ring");
        }

        debug!(
            format = ?output.format(),
            planes = output.planes().len(),
            frames = searched,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "denoised frame"
        );

        Ok(output)
    }
}
