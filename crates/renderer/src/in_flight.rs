//! Index-addressed bookkeeping for frames in flight.
//!
//! Two arenas with independent sizes:
//! - [`SlotRing`]: which of the [`MAX_FRAMES_IN_FLIGHT`] slots is current
//! - [`ImageInFlightMap`]: which slot last submitted work for each swapchain
//!   image, sized to the swapchain's image count

use crate::MAX_FRAMES_IN_FLIGHT;

/// Cycles through the in-flight slots.
#[derive(Debug, Clone, Default)]
pub struct SlotRing {
    /// Current slot index (0 to MAX_FRAMES_IN_FLIGHT - 1)
    current: usize,
}

impl SlotRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot the next frame records into.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Advance to the next slot.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % MAX_FRAMES_IN_FLIGHT;
    }
}

/// Maps swapchain image index to the slot that last submitted work for it.
#[derive(Debug, Clone, Default)]
pub struct ImageInFlightMap {
    owners: Vec<Option<usize>>,
}

impl ImageInFlightMap {
    /// Creates a map for `image_count` images, all unowned.
    pub fn new(image_count: usize) -> Self {
        Self {
            owners: vec![None; image_count],
        }
    }

    /// The slot that last used `image`, if any.
    ///
    /// Indices past the end are reported as unowned.
    pub fn owner(&self, image: usize) -> Option<usize> {
        self.owners.get(image).copied().flatten()
    }

    /// Records that `slot` submitted work for `image`.
    pub fn assign(&mut self, image: usize, slot: usize) {
        if let Some(entry) = self.owners.get_mut(image) {
            *entry = Some(slot);
        }
    }

    /// Resizes to `image_count` and forgets every owner.
    pub fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize(image_count, None);
    }

    /// Number of images tracked.
    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ring_cycles() {
        let mut ring = SlotRing::new();
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(ring.current());
            ring.advance();
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_image_map_starts_empty() {
        let map = ImageInFlightMap::new(3);
        assert_eq!(map.len(), 3);
        assert!((0..3).all(|i| map.owner(i).is_none()));
    }

    #[test]
    fn test_image_map_assign_overwrites() {
        let mut map = ImageInFlightMap::new(3);
        map.assign(2, 0);
        assert_eq!(map.owner(2), Some(0));
        map.assign(2, 1);
        assert_eq!(map.owner(2), Some(1));
        assert_eq!(map.owner(0), None);
    }

    #[test]
    fn test_image_map_reset_resizes_and_clears() {
        let mut map = ImageInFlightMap::new(2);
        map.assign(0, 1);
        map.assign(1, 0);

        map.reset(4);
        assert_eq!(map.len(), 4);
        assert!((0..4).all(|i| map.owner(i).is_none()));
    }

    #[test]
    fn test_image_map_out_of_range() {
        let mut map = ImageInFlightMap::new(1);
        map.assign(5, 0);
        assert_eq!(map.owner(5), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_slot_count_is_independent_of_images() {
        let map = ImageInFlightMap::new(MAX_FRAMES_IN_FLIGHT + 3);
        assert_eq!(map.len(), 5);
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    }
}
