use crate::error::NLMeansError;
use crate::utils::validate_plane_buffer;

/// Sample layout of a frame handed to the engine.
///
/// Planes are always filtered independently; the format only decides how many
/// planes exist and how the chroma planes are subsampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFormat {
    /// Single luma plane
    Mono,
    /// Planar YUV, chroma halved horizontally and vertically
    Yuv420,
    /// Planar YUV, chroma halved horizontally
    Yuv422,
    /// Planar YUV, full resolution chroma
    Yuv444,
    /// Planar RGB
    Rgb,
}

impl ImageFormat {
    /// Number of planes carried by frames of this format.
    #[inline]
    #[must_use]
    pub const fn plane_count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Yuv420 | Self::Yuv422 | Self::Yuv444 | Self::Rgb => 3,
        }
    }

    /// Chroma subsampling as `(log2 horizontal, log2 vertical)` shifts.
    #[inline]
    #[must_use]
    pub const fn chroma_shift(self) -> (u32, u32) {
        match self {
            Self::Yuv420 => (1, 1),
            Self::Yuv422 => (1, 0),
            Self::Mono | Self::Yuv444 | Self::Rgb => (0, 0),
        }
    }

    /// Dimensions of plane `index` for a frame of `width`x`height` luma samples.
    ///
    /// Chroma planes round up, so odd frame sizes keep their last column/row.
    #[must_use]
    pub const fn plane_dimensions(self, index: usize, width: u32, height: u32) -> (u32, u32) {
        if index == 0 {
            return (width, height);
        }
        let (hsub, vsub) = self.chroma_shift();
        (ceil_rshift(width, hsub), ceil_rshift(height, vsub))
    }
}

#[inline]
const fn ceil_rshift(value: u32, shift: u32) -> u32 {
    value.div_ceil(1 << shift)
}

/// Borrowed raw 8-bit plane supplied by the caller.
///
/// The engine never retains this buffer; it copies it into a bordered plane.
#[derive(Debug, Clone, Copy)]
pub struct RawPlane<'a> {
    /// Sample buffer, `stride` bytes per row
    pub data: &'a [u8],
    /// Visible samples per row
    pub width: u32,
    /// Number of rows
    pub height: u32,
    /// Distance in bytes between row starts
    pub stride: usize,
}

impl<'a> RawPlane<'a> {
    /// Create a raw plane view.
    #[must_use]
    pub const fn new(data: &'a [u8], width: u32, height: u32, stride: usize) -> Self {
        Self {
            data,
            width,
            height,
            stride,
        }
    }

    /// Create a raw plane view over a tightly packed buffer (`stride == width`).
    #[must_use]
    pub const fn packed(data: &'a [u8], width: u32, height: u32) -> Self {
        Self::new(data, width, height, width as usize)
    }

    /// Row `y` restricted to its visible samples.
    #[inline]
    pub(crate) fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width as usize]
    }
}

/// One frame handed to the engine: a format and its raw planes.
#[derive(Debug, Clone)]
pub struct FrameInput<'a> {
    /// Layout of the frame
    pub format: ImageFormat,
    /// Raw planes, `format.plane_count()` of them
    pub planes: Vec<RawPlane<'a>>,
}

impl<'a> FrameInput<'a> {
    /// Create a frame from its planes.
    #[must_use]
    pub const fn new(format: ImageFormat, planes: Vec<RawPlane<'a>>) -> Self {
        Self { format, planes }
    }

    /// Create a single-plane frame.
    #[must_use]
    pub fn mono(plane: RawPlane<'a>) -> Self {
        Self::new(ImageFormat::Mono, vec![plane])
    }

    /// Checks plane count and every plane buffer against its declared geometry.
    ///
    /// # Errors
    ///
    /// * `NLMeansError::PlaneCountMismatch` - If the plane count does not match the format
    /// * `NLMeansError::EmptyPlane` - If a plane has zero width or height
    /// * `NLMeansError::InvalidPlane` - If a plane buffer is too short for its stride
    pub fn validate(&self) -> Result<(), NLMeansError> {
        let expected = self.format.plane_count();
        if self.planes.len() != expected {
            return Err(NLMeansError::PlaneCountMismatch {
                format: self.format,
                expected,
                actual: self.planes.len(),
            });
        }

        self.planes.iter().enumerate().try_for_each(|(index, plane)| {
            validate_plane_buffer(
                index,
                plane.data.len(),
                plane.width,
                plane.height,
                plane.stride,
            )
        })
    }
}
