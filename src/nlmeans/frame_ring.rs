use std::collections::VecDeque;

use crate::nlmeans::color::ColorImage;
use crate::nlmeans::params::MAX_TEMPORAL_FRAMES;

/// Bounded history of bordered frames, newest at index 0.
///
/// The ring owns every frame pushed into it. Once full, each push releases
/// the oldest frame back to the caller.
#[derive(Debug, Clone)]
pub struct FrameRing {
    frames: VecDeque<ColorImage>,
    capacity: usize,
}

impl FrameRing {
    /// Create an empty ring holding at most `capacity` frames, clamped to `[1, 32]`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_TEMPORAL_FRAMES);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `image` as the newest frame.
    ///
    /// Every older frame ages by one slot; when the ring is full the oldest
    /// frame is removed and returned.
    pub fn push(&mut self, image: ColorImage) -> Option<ColorImage> {
        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_back()
        } else {
            None
        };
        self.frames.push_front(image);
        evicted
    }

    /// Number of frames currently held, never more than the capacity.
    #[inline]
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.frames.len()
    }

    /// Alias of [`FrameRing::available_count`].
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame has been pushed yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of frames held.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frame `index`, 0 being the most recently pushed.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ColorImage> {
        self.frames.get(index)
    }

    /// The most recently pushed frame.
    #[inline]
    #[must_use]
    pub fn newest(&self) -> Option<&ColorImage> {
        self.frames.front()
    }

    /// Frames from newest to oldest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ColorImage> {
        self.frames.iter()
    }

    /// Release every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::flat_mono_image;

    fn first_sample(ring: &FrameRing, index: usize) -> u8 {
        ring.get(index)
            .and_then(|image| image.plane(0))
            .and_then(|plane| plane.get(0, 0))
            .unwrap()
    }

    #[test]
    fn push_with_room_grows_without_eviction() {
        let mut ring = FrameRing::new(3);
        assert!(ring.is_empty());
        assert!(ring.push(flat_mono_image(4, 4, 1)).is_none());
        assert_eq!(ring.available_count(), 1);
        assert!(ring.push(flat_mono_image(4, 4, 2)).is_none());
        assert_eq!(ring.available_count(), 2);
        assert_eq!(first_sample(&ring, 0), 2);
        assert_eq!(first_sample(&ring, 1), 1);
    }

    #[test]
    fn push_past_capacity_releases_first_pushed_frame() {
        let capacity = 3;
        let mut ring = FrameRing::new(capacity);
        for value in 0..capacity as u8 {
            assert!(ring.push(flat_mono_image(4, 4, value)).is_none());
        }

        let evicted = ring.push(flat_mono_image(4, 4, 3)).unwrap();
        assert_eq!(evicted.plane(0).unwrap().get(0, 0), Some(0));
        assert_eq!(ring.len(), capacity);
        assert_eq!(
            ring.iter()
                .map(|image| image.plane(0).unwrap().get(0, 0).unwrap())
                .collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn push_with_capacity_one_keeps_only_newest() {
        let mut ring = FrameRing::new(1);
        ring.push(flat_mono_image(2, 2, 10));
        let evicted = ring.push(flat_mono_image(2, 2, 20));
        assert!(evicted.is_some());
        assert_eq!(ring.len(), 1);
        assert_eq!(first_sample(&ring, 0), 20);
    }

    #[test]
    fn new_with_out_of_range_capacity_clamps() {
        assert_eq!(FrameRing::new(0).capacity(), 1);
        assert_eq!(FrameRing::new(100).capacity(), MAX_TEMPORAL_FRAMES);
    }

    #[test]
    fn clear_with_frames_empties_ring() {
        let mut ring = FrameRing::new(2);
        ring.push(flat_mono_image(2, 2, 1));
        ring.clear();
        assert!(ring.is_empty());
        assert!(ring.newest().is_none());
    }
}
