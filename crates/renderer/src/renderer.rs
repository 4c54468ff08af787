//! Main renderer orchestration.
//!
//! This module provides the main [`Renderer`] struct that owns every Vulkan
//! object and drives one frame per [`Renderer::render_frame`] call.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use vkframe_core::Config;
use vkframe_platform::{Surface, Window};
use vkframe_rhi::command::CommandPool;
use vkframe_rhi::device::Device;
use vkframe_rhi::instance::{Instance, InstanceDesc};
use vkframe_rhi::physical_device::select_physical_device;
use vkframe_rhi::swapchain::{AcquireOutcome, PresentOutcome};
use vkframe_rhi::{RhiError, RhiResult};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::driver::{FrameBackend, FrameDriver, FrameOutcome, FrameStats};
use crate::error::RendererResult;
use crate::frame_manager::FramePool;
use crate::geometry::QuadMesh;
use crate::recreation::{DrawableSurface, wait_for_drawable};
use crate::targets::{RenderTargets, ShaderCode};

/// Main renderer that manages all Vulkan resources.
///
/// # Resource Destruction Order
///
/// Vulkan resources must be destroyed in the correct order:
/// 1. Wait for all GPU work to complete
/// 2. Destroy per-slot semaphores and fences
/// 3. Destroy the command pool
/// 4. Destroy index and vertex buffers and free their memory
/// 5. Destroy framebuffers, pipeline, render pass, image views, swapchain
/// 6. Destroy the memory allocator, then the device
/// 7. Destroy surface
/// 8. Destroy instance
///
/// Step 1 is [`Drop`]; the rest follows from field declaration order. The
/// window is owned by the caller and must be dropped after the renderer.
pub struct Renderer {
    /// Frame state machine (plain data).
    driver: FrameDriver,
    /// Per-slot command buffers, semaphores and fences.
    frames: FramePool,
    /// Pool the slot command buffers are allocated from.
    command_pool: CommandPool,
    /// Quad vertex and index buffers.
    mesh: QuadMesh,
    /// Swapchain and everything built from it; `None` only after a failed rebuild.
    targets: Option<RenderTargets>,
    /// Logical device. Holds the allocator, released with the last `Arc`.
    device: Arc<Device>,
    /// Window surface (destroyed after the device, before the instance).
    surface: Surface,
    /// Vulkan instance (destroyed last).
    instance: Instance,

    shaders: ShaderCode,
    clear_color: [f32; 4],
}

impl Renderer {
    /// Creates a renderer presenting to `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if shader bytecode is missing or any Vulkan object
    /// cannot be created. Everything created so far is released.
    pub fn new(window: &Window, config: &Config) -> RendererResult<Self> {
        let (width, height) = window.framebuffer_size();
        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let shaders = ShaderCode::load(&config.shaders)?;

        let instance = Instance::new(&InstanceDesc {
            application_name: &config.renderer.application_name,
            enable_validation: config.renderer.validation,
            surface_extensions: window.required_extensions()?,
        })?;

        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        let targets = RenderTargets::new(
            &instance,
            &device,
            surface.handle(),
            (width, height),
            &shaders,
        )?;

        let mesh = QuadMesh::upload(&device)?;

        let command_pool = CommandPool::new(device.clone(), device.queue_families().graphics)?;
        let frames = FramePool::new(device.clone(), &command_pool)?;

        let driver = FrameDriver::new(targets.image_count(), window.resize_signal());

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, {} indices",
            targets.image_count(),
            MAX_FRAMES_IN_FLIGHT,
            mesh.index_count()
        );

        Ok(Self {
            driver,
            frames,
            command_pool,
            mesh,
            targets: Some(targets),
            device,
            surface,
            instance,
            shaders,
            clear_color: config.renderer.clear_color,
        })
    }

    /// Renders one frame.
    ///
    /// `window` is only used while a swapchain rebuild waits for a
    /// non-zero drawable area.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the frame fails. The frame is
    /// skipped and the next call retries.
    pub fn render_frame<S: DrawableSurface>(
        &mut self,
        window: &mut S,
    ) -> RendererResult<FrameOutcome> {
        let mut backend = GpuBackend {
            instance: &self.instance,
            device: &self.device,
            surface: &self.surface,
            frames: &mut self.frames,
            command_pool: &self.command_pool,
            mesh: &self.mesh,
            targets: &mut self.targets,
            shaders: &self.shaders,
            clear_color: self.clear_color,
            window,
        };

        Ok(self.driver.tick(&mut backend)?)
    }

    /// Frame counters since creation.
    pub fn stats(&self) -> FrameStats {
        self.driver.stats()
    }

    /// Returns the current swapchain extent, if a swapchain exists.
    pub fn extent(&self) -> Option<vk::Extent2D> {
        self.targets.as_ref().map(RenderTargets::extent)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Wait for all GPU work to complete before destroying resources
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        info!("Renderer destroyed");
    }
}

/// The real [`FrameBackend`], borrowing the renderer's objects for one tick.
struct GpuBackend<'a, S: ?Sized> {
    instance: &'a Instance,
    device: &'a Arc<Device>,
    surface: &'a Surface,
    frames: &'a mut FramePool,
    command_pool: &'a CommandPool,
    mesh: &'a QuadMesh,
    targets: &'a mut Option<RenderTargets>,
    shaders: &'a ShaderCode,
    clear_color: [f32; 4],
    window: &'a mut S,
}

impl<S: ?Sized> GpuBackend<'_, S> {
    fn targets(&self) -> RhiResult<&RenderTargets> {
        self.targets.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Render targets are missing after a failed rebuild".to_string())
        })
    }
}

impl<S: DrawableSurface + ?Sized> FrameBackend for GpuBackend<'_, S> {
    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()> {
        self.frames.slot(slot).in_flight_fence().wait(u64::MAX)
    }

    fn acquire(&mut self, slot: usize) -> RhiResult<AcquireOutcome> {
        let semaphore = self.frames.slot(slot).image_available().handle();
        self.targets()?.swapchain().acquire_next_image(semaphore)
    }

    fn record(&mut self, slot: usize, image: u32) -> RhiResult<()> {
        let targets = self.targets()?;
        let framebuffer = targets.framebuffer(image as usize).ok_or_else(|| {
            RhiError::InvalidHandle(format!("No framebuffer for swapchain image {}", image))
        })?;
        let cmd = self.frames.slot(slot).command_buffer();

        cmd.reset()?;
        cmd.begin()?;
        cmd.begin_render_pass(
            targets.render_pass().handle(),
            framebuffer.handle(),
            targets.extent(),
            self.clear_color,
        );
        cmd.bind_graphics_pipeline(targets.pipeline().handle());
        self.mesh.draw(cmd);
        cmd.end_render_pass();
        cmd.end()
    }

    fn submit(&mut self, slot: usize) -> RhiResult<()> {
        let frame = self.frames.slot(slot);

        let wait_semaphores = [frame.image_available().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_finished().handle()];
        let command_buffers = [frame.command_buffer().handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // Reset only once the submission is certain to be attempted
        frame.in_flight_fence().reset()?;

        // SAFETY: The command buffer was fully recorded by `record`, the
        // semaphores and fence belong to this device and the fence was just
        // reset after the driver observed it signaled.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], frame.in_flight_fence().handle())
        }
    }

    fn present(&mut self, slot: usize, image: u32) -> RhiResult<PresentOutcome> {
        let semaphore = self.frames.slot(slot).render_finished().handle();
        self.targets()?
            .swapchain()
            .present(self.device.present_queue(), image, semaphore)
    }

    fn recreate(&mut self) -> RhiResult<usize> {
        let drawable = wait_for_drawable(&mut *self.window).ok_or_else(|| {
            RhiError::SwapchainError("Window closed while minimized".to_string())
        })?;

        self.device.wait_idle()?;

        // Old objects go first: a surface supports one swapchain at a time
        *self.targets = None;

        let targets = RenderTargets::new(
            self.instance,
            self.device,
            self.surface.handle(),
            drawable,
            self.shaders,
        )?;
        let image_count = targets.image_count();
        *self.targets = Some(targets);

        self.command_pool.reset(false)?;

        debug!(
            "Recreated render targets for {}x{} drawable",
            drawable.0, drawable.1
        );
        Ok(image_count)
    }

    fn abandon(&mut self, slot: usize) -> RhiResult<()> {
        self.device.wait_idle()?;
        self.frames.renew_image_available(slot)
    }
}
