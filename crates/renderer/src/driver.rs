//! The per-frame state machine.
//!
//! [`FrameDriver`] decides *when* each GPU operation happens; a
//! [`FrameBackend`] performs it. One [`FrameDriver::tick`] renders at most one
//! frame:
//!
//! ```text
//! [rebuild if pending]
//!   -> wait on own slot fence (if in flight)
//!   -> acquire            (out of date: rebuild, keep slot, stop)
//!   -> wait on image owner (if another slot in flight)
//!   -> record -> submit   (slot marked in flight, image mapped to slot)
//!   -> present
//!   -> advance slot
//!   -> rebuild if present was stale, acquire was suboptimal or a resize
//!      was signaled
//! ```
//!
//! Errors before present abandon the tick and are returned; the next tick
//! starts over. A rebuild failing after present leaves the rebuild pending
//! and still reports the frame as presented.

use tracing::{debug, info, warn};

use vkframe_platform::ResizeSignal;
use vkframe_rhi::RhiResult;
use vkframe_rhi::swapchain::{AcquireOutcome, PresentOutcome};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::in_flight::{ImageInFlightMap, SlotRing};

/// GPU operations the driver sequences.
///
/// Slots are indices in `0..MAX_FRAMES_IN_FLIGHT`; images are swapchain
/// image indices.
pub trait FrameBackend {
    /// Blocks until the last submission of `slot` has completed.
    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()>;

    /// Acquires the next swapchain image, signaling the slot's acquire
    /// semaphore.
    fn acquire(&mut self, slot: usize) -> RhiResult<AcquireOutcome>;

    /// Records the slot's command buffer to draw into `image`.
    fn record(&mut self, slot: usize, image: u32) -> RhiResult<()>;

    /// Resets the slot's fence and submits its command buffer, arming the
    /// fence.
    fn submit(&mut self, slot: usize) -> RhiResult<()>;

    /// Presents `image` once the slot's rendering has finished.
    fn present(&mut self, slot: usize, image: u32) -> RhiResult<PresentOutcome>;

    /// Rebuilds every swapchain-dependent object after waiting for the
    /// device to go idle. Returns the new swapchain image count.
    fn recreate(&mut self) -> RhiResult<usize>;

    /// Called when `slot` acquired an image that will not be submitted, so
    /// its acquire semaphore can be made reusable.
    fn abandon(&mut self, slot: usize) -> RhiResult<()>;
}

/// What a successful [`FrameDriver::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and presented from `slot` into `image_index`.
    /// `rebuilt` is set when the swapchain was recreated after presenting;
    /// if that recreation failed it is retried on the next tick.
    Presented {
        slot: usize,
        image_index: u32,
        rebuilt: bool,
    },
    /// Acquire found the surface out of date; the swapchain was rebuilt
    /// and nothing was drawn.
    SurfaceStale,
}

/// Running totals kept by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames that reached the present queue.
    pub presented: u64,
    /// Successful swapchain rebuilds.
    pub rebuilds: u64,
    /// Ticks that returned an error or found the surface stale.
    pub skipped: u64,
}

/// Frame lifecycle state machine.
#[derive(Debug)]
pub struct FrameDriver {
    slots: SlotRing,
    images_in_flight: ImageInFlightMap,
    /// Whether each slot's fence was armed by a submission not yet waited on.
    in_flight: [bool; MAX_FRAMES_IN_FLIGHT],
    rebuild_pending: bool,
    resize: ResizeSignal,
    stats: FrameStats,
}

impl FrameDriver {
    /// Creates a driver for a swapchain of `image_count` images.
    pub fn new(image_count: usize, resize: ResizeSignal) -> Self {
        Self {
            slots: SlotRing::new(),
            images_in_flight: ImageInFlightMap::new(image_count),
            in_flight: [false; MAX_FRAMES_IN_FLIGHT],
            rebuild_pending: false,
            resize,
            stats: FrameStats::default(),
        }
    }

    /// Renders one frame.
    ///
    /// # Errors
    ///
    /// Returns the first backend error. The iteration is abandoned and the
    /// next call retries; a failed rebuild is retried before the next
    /// acquire.
    pub fn tick<B: FrameBackend>(&mut self, backend: &mut B) -> RhiResult<FrameOutcome> {
        let result = self.run(backend);
        if !matches!(result, Ok(FrameOutcome::Presented { .. })) {
            self.stats.skipped += 1;
        }
        result
    }

    fn run<B: FrameBackend>(&mut self, backend: &mut B) -> RhiResult<FrameOutcome> {
        if self.rebuild_pending {
            debug!("Retrying pending swapchain rebuild");
            self.rebuild(backend)?;
        }

        let slot = self.slots.current();
        if self.in_flight[slot] {
            backend.wait_for_slot(slot)?;
            self.in_flight[slot] = false;
        }

        let (image_index, suboptimal) = match backend.acquire(slot)? {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date during acquire");
                self.rebuild(backend)?;
                return Ok(FrameOutcome::SurfaceStale);
            }
        };

        if let Err(e) = self.record_and_submit(backend, slot, image_index) {
            self.discard_acquired(backend, slot);
            return Err(e);
        }

        let presented = backend.present(slot, image_index);
        self.slots.advance();
        let presented = presented?;
        self.stats.presented += 1;

        // The resize flag is only consulted once the present was issued
        let resized = self.resize.take();
        let mut rebuilt = false;
        if presented.is_stale() || suboptimal || resized {
            debug!(
                "Rebuilding after present (present {:?}, acquire suboptimal {}, resized {})",
                presented, suboptimal, resized
            );
            // The frame is already on screen; a failed rebuild stays pending
            match self.rebuild(backend) {
                Ok(()) => rebuilt = true,
                Err(e) => warn!("Swapchain rebuild after present failed: {}", e),
            }
        }

        Ok(FrameOutcome::Presented {
            slot,
            image_index,
            rebuilt,
        })
    }

    fn record_and_submit<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        slot: usize,
        image_index: u32,
    ) -> RhiResult<()> {
        let image = image_index as usize;
        if let Some(owner) = self.images_in_flight.owner(image)
            && owner != slot
            && self.in_flight[owner]
        {
            backend.wait_for_slot(owner)?;
            self.in_flight[owner] = false;
        }

        backend.record(slot, image_index)?;
        backend.submit(slot)?;

        self.in_flight[slot] = true;
        self.images_in_flight.assign(image, slot);
        Ok(())
    }

    /// The slot holds an acquired image that will never be presented, and
    /// an acquire semaphore nothing will wait on. Both are cleared by
    /// renewing the semaphore and rebuilding the swapchain on the next tick.
    fn discard_acquired<B: FrameBackend>(&mut self, backend: &mut B, slot: usize) {
        if let Err(e) = backend.abandon(slot) {
            warn!("Failed to release abandoned frame in slot {}: {}", slot, e);
        }
        self.rebuild_pending = true;
    }

    /// Recreates the swapchain and everything built from it.
    ///
    /// On success every image is unowned and every slot idle, since the
    /// backend waits for the device before rebuilding. On failure the
    /// rebuild stays pending.
    ///
    /// # Errors
    ///
    /// Returns the backend's recreation error.
    pub fn rebuild<B: FrameBackend>(&mut self, backend: &mut B) -> RhiResult<()> {
        match backend.recreate() {
            Ok(image_count) => {
                self.images_in_flight.reset(image_count);
                self.in_flight = [false; MAX_FRAMES_IN_FLIGHT];
                self.rebuild_pending = false;
                self.stats.rebuilds += 1;
                info!("Swapchain rebuilt with {} images", image_count);
                Ok(())
            }
            Err(e) => {
                self.rebuild_pending = true;
                Err(e)
            }
        }
    }

    /// The slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.slots.current()
    }

    /// Whether the next tick starts with a rebuild.
    #[inline]
    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Whether `slot` has a submission that was not waited on yet.
    pub fn is_in_flight(&self, slot: usize) -> bool {
        self.in_flight.get(slot).copied().unwrap_or(false)
    }

    #[inline]
    pub fn images_in_flight(&self) -> &ImageInFlightMap {
        &self.images_in_flight
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
