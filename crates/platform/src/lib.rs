//! Platform layer for vkframe.
//!
//! This crate provides:
//! - A winit window that the application pumps once per frame
//! - The shared resize flag consumed by the frame driver
//! - Vulkan surface creation and the instance extensions it needs

mod resize;
mod window;

pub use resize::ResizeSignal;
pub use window::{Surface, Window};
