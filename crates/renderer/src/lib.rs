//! Frame lifecycle on top of the RHI layer.
//!
//! This crate drives the per-frame loop:
//! - Per-slot frame resources and in-flight bookkeeping
//! - The acquire/record/submit/present state machine
//! - Swapchain recreation and ordered teardown

pub mod driver;
pub mod error;
pub mod frame_manager;
pub mod geometry;
pub mod in_flight;
pub mod recreation;
pub mod renderer;
pub mod targets;

pub use driver::{FrameBackend, FrameDriver, FrameOutcome, FrameStats};
pub use error::{ErrorClass, RendererError, RendererResult};
pub use recreation::DrawableSurface;
pub use renderer::Renderer;

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
