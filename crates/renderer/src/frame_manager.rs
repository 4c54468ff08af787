//! Per-slot frame resources.
//!
//! The [`FramePool`] owns [`MAX_FRAMES_IN_FLIGHT`] sets of resources, one per
//! in-flight slot. The slot count does not depend on the swapchain image
//! count, so the pool survives swapchain recreation untouched: only its
//! command buffers are reset.
//!
//! # Synchronization Flow
//!
//! ```text
//! 1. Wait on in_flight_fence (CPU waits for previous use of this slot)
//! 2. Acquire swapchain image (signals image_available)
//! 3. Record commands to command_buffer
//! 4. Reset in_flight_fence, then submit command_buffer:
//!    - Wait on image_available at COLOR_ATTACHMENT_OUTPUT
//!    - Signal render_finished
//!    - Signal in_flight_fence
//! 5. Present (waits on render_finished)
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use vkframe_rhi::RhiResult;
use vkframe_rhi::command::{CommandBuffer, CommandPool};
use vkframe_rhi::device::Device;
use vkframe_rhi::sync::{Fence, Semaphore};

use crate::MAX_FRAMES_IN_FLIGHT;

/// Resources owned by one in-flight slot.
pub struct FrameSlot {
    /// Command buffer for recording rendering commands.
    command_buffer: CommandBuffer,
    /// Semaphore signaled when a swapchain image is available.
    image_available: Semaphore,
    /// Semaphore signaled when rendering is complete.
    render_finished: Semaphore,
    /// Fence used to wait for slot completion before reusing resources.
    in_flight_fence: Fence,
}

impl FrameSlot {
    fn new(device: Arc<Device>, command_buffer: vk::CommandBuffer) -> RhiResult<Self> {
        let command_buffer = CommandBuffer::from_handle(device.clone(), command_buffer);
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        // Signaled so the first wait on a fresh slot returns immediately
        let in_flight_fence = Fence::new(device, true)?;

        Ok(Self {
            command_buffer,
            image_available,
            render_finished,
            in_flight_fence,
        })
    }

    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    #[inline]
    pub fn render_finished(&self) -> &Semaphore {
        &self.render_finished
    }

    #[inline]
    pub fn in_flight_fence(&self) -> &Fence {
        &self.in_flight_fence
    }
}

/// Fixed ring of per-slot frame resources.
///
/// Command buffers come from a caller-owned [`CommandPool`] created with
/// `RESET_COMMAND_BUFFER`; the pool must outlive this value.
pub struct FramePool {
    device: Arc<Device>,
    slots: Vec<FrameSlot>,
}

impl FramePool {
    /// Allocates [`MAX_FRAMES_IN_FLIGHT`] slots from `command_pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if command buffer allocation or any semaphore or
    /// fence creation fails. Objects created so far are destroyed.
    pub fn new(device: Arc<Device>, command_pool: &CommandPool) -> RhiResult<Self> {
        let command_buffers = command_pool.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;

        let slots = command_buffers
            .into_iter()
            .enumerate()
            .map(|(i, command_buffer)| {
                let slot = FrameSlot::new(device.clone(), command_buffer)?;
                debug!("Created frame slot {}", i);
                Ok(slot)
            })
            .collect::<RhiResult<Vec<_>>>()?;

        info!("Frame pool created with {} frames in flight", slots.len());

        Ok(Self { device, slots })
    }

    /// Resources of slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_FRAMES_IN_FLIGHT`.
    #[inline]
    pub fn slot(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replaces the "image available" semaphore of slot `index`.
    ///
    /// Used when an acquired image is abandoned before submission: nothing
    /// will ever wait on the old semaphore, so it cannot be signaled again.
    /// The device must be idle.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails; the old semaphore is
    /// kept in that case.
    pub fn renew_image_available(&mut self, index: usize) -> RhiResult<()> {
        let semaphore = Semaphore::new(self.device.clone())?;
        if let Some(slot) = self.slots.get_mut(index) {
            slot.image_available = semaphore;
            debug!("Renewed image-available semaphore for slot {}", index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_frames_in_flight_constant() {
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    }

    #[test]
    fn test_frame_pool_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FramePool>();
        assert_send::<FrameSlot>();
    }
}
