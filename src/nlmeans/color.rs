use crate::error::NLMeansError;
use crate::nlmeans::format::{FrameInput, ImageFormat};
use crate::nlmeans::plane::{BorderedPlane, Plane};

/// Up to three bordered planes sharing one format tag.
///
/// Planes the format does not carry are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    format: ImageFormat,
    planes: [Option<BorderedPlane>; 3],
}

impl ColorImage {
    /// Create a bordered copy of every plane of `frame`.
    ///
    /// Either every plane is copied or, on failure, nothing is kept.
    ///
    /// # Errors
    ///
    /// * Input validation errors from [`FrameInput::validate`]
    /// * `NLMeansError::AllocationFailure` - If any bordered buffer cannot be allocated
    pub fn from_frame(frame: &FrameInput<'_>, requested_border: usize) -> Result<Self, NLMeansError> {
        frame.validate()?;

        let mut planes: [Option<BorderedPlane>; 3] = [None, None, None];
        for (index, (slot, raw)) in planes.iter_mut().zip(&frame.planes).enumerate() {
            *slot = Some(BorderedPlane::extend_plane(index, raw, requested_border)?);
        }

        Ok(Self {
            format: frame.format,
            planes,
        })
    }

    /// Create an image from already bordered planes.
    #[must_use]
    pub const fn from_planes(format: ImageFormat, planes: [Option<BorderedPlane>; 3]) -> Self {
        Self { format, planes }
    }

    /// Format tag of the image.
    #[inline]
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// Plane `index`, if present.
    #[inline]
    #[must_use]
    pub fn plane(&self, index: usize) -> Option<&BorderedPlane> {
        self.planes.get(index).and_then(Option::as_ref)
    }

    /// Present planes with their indices.
    pub fn planes(&self) -> impl Iterator<Item = (usize, &BorderedPlane)> {
        self.planes
            .iter()
            .enumerate()
            .filter_map(|(index, plane)| plane.as_ref().map(|plane| (index, plane)))
    }

    /// Whether `other` has the same format and plane geometry.
    ///
    /// Frames of one temporal sequence must agree on this before they are searched together.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.format == other.format
            && self.planes.iter().zip(&other.planes).all(|pair| match pair {
                (Some(a), Some(b)) => {
                    a.width() == b.width() && a.height() == b.height() && a.border() == b.border()
                }
                (None, None) => true,
                _ => false,
            })
    }
}

/// The denoised frame returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenoisedImage {
    format: ImageFormat,
    planes: Vec<Plane>,
}

impl DenoisedImage {
    /// Allocate one output plane per present plane of `image`.
    pub(crate) fn allocate_for(image: &ColorImage) -> Result<Self, NLMeansError> {
        let planes = image
            .planes()
            .map(|(_, plane)| Plane::allocate(plane.width() as u32, plane.height() as u32))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            format: image.format(),
            planes,
        })
    }

    /// Format of the frame.
    #[inline]
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// Plane `index`, if present.
    #[inline]
    #[must_use]
    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    /// All output planes in plane order.
    #[inline]
    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub(crate) fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    /// Consume the image, returning its planes.
    #[must_use]
    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlmeans::format::RawPlane;

    #[test]
    fn from_frame_with_yuv420_borders_every_plane() {
        let luma = [1u8; 16];
        let chroma = [2u8; 4];
        let frame = FrameInput::new(
            ImageFormat::Yuv420,
            vec![
                RawPlane::packed(&luma, 4, 4),
                RawPlane::packed(&chroma, 2, 2),
                RawPlane::packed(&chroma, 2, 2),
            ],
        );

        let image = ColorImage::from_frame(&frame, 2).unwrap();
        assert_eq!(image.format(), ImageFormat::Yuv420);
        assert_eq!(image.planes().count(), 3);
        assert_eq!(image.plane(0).unwrap().width(), 4);
        assert_eq!(image.plane(1).unwrap().width(), 2);
        assert_eq!(image.plane(2).unwrap().get(-1, -1), Some(2));
    }

    #[test]
    fn from_frame_with_mono_leaves_chroma_absent() {
        let luma = [9u8; 9];
        let image = ColorImage::from_frame(&FrameInput::mono(RawPlane::packed(&luma, 3, 3)), 1)
            .unwrap();
        assert!(image.plane(0).is_some());
        assert!(image.plane(1).is_none());
        assert!(image.plane(2).is_none());
    }

    #[test]
    fn is_compatible_with_different_geometry_returns_false() {
        let small = [0u8; 9];
        let large = [0u8; 16];
        let a = ColorImage::from_frame(&FrameInput::mono(RawPlane::packed(&small, 3, 3)), 1)
            .unwrap();
        let b = ColorImage::from_frame(&FrameInput::mono(RawPlane::packed(&large, 4, 4)), 1)
            .unwrap();
        let c = ColorImage::from_frame(&FrameInput::mono(RawPlane::packed(&small, 3, 3)), 1)
            .unwrap();
        assert!(!a.is_compatible_with(&b));
        assert!(a.is_compatible_with(&c));
    }

    #[test]
    fn allocate_for_with_color_image_matches_plane_dimensions() {
        let luma = [0u8; 24];
        let chroma = [0u8; 6];
        let frame = FrameInput::new(
            ImageFormat::Yuv422,
            vec![
                RawPlane::packed(&luma, 6, 4),
                RawPlane::packed(&chroma, 3, 2),
                RawPlane::packed(&chroma, 3, 2),
            ],
        );
        let image = ColorImage::from_frame(&frame, 1).unwrap();
        let output = DenoisedImage::allocate_for(&image).unwrap();
        assert_eq!(output.planes().len(), 3);
        assert_eq!((output.planes()[0].width(), output.planes()[0].height()), (6, 4));
        assert_eq!((output.planes()[1].width(), output.planes()[1].height()), (3, 2));
    }
}
