//! Framebuffers over swapchain image views.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan framebuffer wrapper referencing a single color image view.
pub struct Framebuffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan framebuffer handle.
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Creates a framebuffer for `image_view` compatible with `render_pass`.
    ///
    /// # Errors
    ///
    /// Returns an error if framebuffer creation fails.
    pub fn new(
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        image_view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let attachments = [image_view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.handle().create_framebuffer(&create_info, None)? };

        Ok(Self {
            device,
            framebuffer,
        })
    }

    /// Returns the Vulkan framebuffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Creates one framebuffer per image view, in image order.
///
/// On failure the framebuffers created so far are dropped.
///
/// # Errors
///
/// Returns the first framebuffer creation error.
pub fn create_framebuffers(
    device: &Arc<Device>,
    render_pass: vk::RenderPass,
    image_views: &[vk::ImageView],
    extent: vk::Extent2D,
) -> RhiResult<Vec<Framebuffer>> {
    let framebuffers = image_views
        .iter()
        .map(|&view| Framebuffer::new(device.clone(), render_pass, view, extent))
        .collect::<RhiResult<Vec<_>>>()?;

    debug!(
        "Created {} framebuffer(s) at {}x{}",
        framebuffers.len(),
        extent.width,
        extent.height
    );
    Ok(framebuffers)
}
