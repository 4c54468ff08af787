//! Core utilities shared by the vkframe crates.
//!
//! - Error types and result aliases
//! - Logging initialization
//! - Configuration loading
//! - Frame timing

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, RendererConfig, ShaderConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
