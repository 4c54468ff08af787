//! Window management using winit.
//!
//! The window owns its event loop and drives it with `pump_app_events`, so the
//! application keeps control of the frame loop: it polls events once per
//! frame, and blocks for a bounded time only while the window is minimized.

use std::ffi::c_char;
use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use vkframe_core::{Error, Result};

use crate::resize::ResizeSignal;

/// Upper bound for a single [`Window::wait_events`] call.
const WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// How long [`Window::new`] pumps the event loop waiting for the window.
const CREATE_TIMEOUT: Duration = Duration::from_secs(5);

/// RAII wrapper for a Vulkan surface.
///
/// The caller must ensure that the Vulkan instance and the window outlive
/// this surface.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Get the raw Vulkan surface handle.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Get the surface extension loader used for capability queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: The handle was created by ash_window::create_surface from the
        // same instance as the loader, and is destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}

/// Event handler state driven by the pumped event loop.
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Arc<WinitWindow>>,
    close_requested: bool,
    resize: ResizeSignal,
    creation_error: Option<String>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                info!("Window created: {}x{}", size.width, size.height);
                self.window = Some(Arc::new(window));
            }
            Err(e) => self.creation_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
                self.resize.raise();
            }
            _ => {}
        }
    }
}

/// A single application window.
///
/// Drop the window only after every Vulkan object created against it,
/// including the [`Surface`].
pub struct Window {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl Window {
    /// Creates a resizable window with the given inner size and title.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Window`] if the event loop or the window cannot be
    /// created.
    pub fn new(width: u32, height: u32, title: &str) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;

        let mut this = Self {
            event_loop,
            state: WindowState {
                attributes: window_attributes(width, height, title),
                window: None,
                close_requested: false,
                resize: ResizeSignal::new(),
                creation_error: None,
            },
        };

        let deadline = std::time::Instant::now() + CREATE_TIMEOUT;
        while this.state.window.is_none() {
            if let Some(e) = this.state.creation_error.take() {
                return Err(Error::Window(e));
            }
            if std::time::Instant::now() >= deadline {
                return Err(Error::Window(
                    "Event loop never resumed; no window was created".to_string(),
                ));
            }
            this.pump(Some(Duration::from_millis(10)));
        }

        // The initial Resized event is not a resize
        this.state.resize.take();
        Ok(this)
    }

    /// Whether the user asked to close the window.
    pub fn should_close(&self) -> bool {
        self.state.close_requested
    }

    /// Processes pending events without blocking.
    pub fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    /// Blocks until events arrive or a short timeout passes.
    pub fn wait_events(&mut self) {
        self.pump(Some(WAIT_TIMEOUT));
    }

    /// Current drawable size in pixels; `(0, 0)` while minimized.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.state
            .window
            .as_ref()
            .map(|window| {
                let size = window.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    /// Returns a handle to the flag raised on every resize.
    pub fn resize_signal(&self) -> ResizeSignal {
        self.state.resize.clone()
    }

    /// Get the Vulkan instance extensions needed to present to this window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Surface`] if the display handle is unavailable or the
    /// platform is unsupported.
    pub fn required_extensions(&self) -> Result<Vec<*const c_char>> {
        let display_handle = self
            .event_loop
            .display_handle()
            .map_err(|e| Error::Surface(format!("Failed to get display handle: {}", e)))?;

        let extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| {
                Error::Surface(format!("Failed to enumerate required extensions: {}", e))
            })?;

        debug!(
            "Required Vulkan extensions for surface: {:?}",
            extensions
                .iter()
                // SAFETY: ash_window returns pointers to static, null-terminated names
                .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
                .collect::<Vec<_>>()
        );

        Ok(extensions.to_vec())
    }

    /// Create a Vulkan surface for this window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Surface`] if the window handles are unavailable or
    /// surface creation fails.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let window = self
            .state
            .window
            .as_ref()
            .ok_or_else(|| Error::Surface("Window has not been created".to_string()))?;

        let display_handle = window
            .display_handle()
            .map_err(|e| Error::Surface(format!("Failed to get display handle: {}", e)))?;

        let window_handle = window
            .window_handle()
            .map_err(|e| Error::Surface(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: The handles come from a live winit window; the surface is
        // destroyed in Surface::drop before the instance.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Surface(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            if code != 0 {
                warn!("Event loop exited with code {}", code);
            }
            self.state.close_requested = true;
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.state.window = None;
        info!("Window destroyed");
    }
}

fn window_attributes(width: u32, height: u32, title: &str) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(title)
        .with_inner_size(PhysicalSize::new(width, height))
        .with_resizable(true)
}
