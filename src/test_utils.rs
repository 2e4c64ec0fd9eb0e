//! Shared builders for unit tests.

use crate::nlmeans::{BorderedPlane, ColorImage, FrameInput, RawPlane};

/// Bordered copy of a packed `width`x`height` plane.
pub fn bordered(data: &[u8], width: usize, height: usize, border: usize) -> BorderedPlane {
    BorderedPlane::extend(&RawPlane::packed(data, width as u32, height as u32), border).unwrap()
}

/// Bordered plane whose sample at `(x, y)` is `f(x, y)`.
pub fn bordered_from_fn(
    width: usize,
    height: usize,
    border: usize,
    f: impl Fn(usize, usize) -> u8,
) -> BorderedPlane {
    let data: Vec<u8> = itertools::iproduct!(0..height, 0..width)
        .map(|(y, x)| f(x, y))
        .collect();
    bordered(&data, width, height, border)
}

/// Single-plane image filled with `value`.
pub fn flat_mono_image(width: u32, height: u32, value: u8) -> ColorImage {
    let data = vec![value; width as usize * height as usize];
    ColorImage::from_frame(&FrameInput::mono(RawPlane::packed(&data, width, height)), 1).unwrap()
}

/// Deterministic noise from a 32-bit xorshift generator.
pub fn pseudo_random_plane(width: usize, height: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9) | 1;
    (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}
