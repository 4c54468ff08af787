//! Runtime configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so a
//! missing file or a partial file is valid:
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//!
//! [renderer]
//! clear_color = [0.1, 0.1, 0.1, 1.0]
//!
//! [shaders]
//! vertex = "shaders/vert.spv"
//! fragment = "shaders/frag.spv"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Window creation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Initial drawable width in physical pixels.
    pub width: u32,
    /// Initial drawable height in physical pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Vulkan".to_string(),
        }
    }
}

/// Renderer and instance parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Name reported to the driver in `VkApplicationInfo`.
    pub application_name: String,
    /// Enable the Khronos validation layer when it is installed.
    pub validation: bool,
    /// RGBA clear colour of the single colour attachment.
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Hello Vulkan".to_string(),
            validation: cfg!(debug_assertions),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Locations of the SPIR-V bytecode files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/vert.spv"),
            fragment: PathBuf::from("shaders/frag.spv"),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    pub shaders: ShaderConfig,
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error, as is a parsed configuration that fails
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`], [`Error::ConfigParse`] or [`Error::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Rejects values the renderer cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.shaders.vertex.as_os_str().is_empty()
            || self.shaders.fragment.as_os_str().is_empty()
        {
            return Err(Error::Config("shader paths must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "Vulkan");
        assert_eq!(config.renderer.application_name, "Hello Vulkan");
        assert_eq!(config.renderer.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.shaders.vertex, PathBuf::from("shaders/vert.spv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            width = 1024
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.shaders, ShaderConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            [window]
            width = 1280
            height = 720
            title = "Quad"

            [renderer]
            application_name = "Quad"
            validation = false
            clear_color = [0.1, 0.2, 0.3, 1.0]

            [shaders]
            vertex = "a.spv"
            fragment = "b.spv"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Quad");
        assert!(!config.renderer.validation);
        assert_eq!(config.renderer.clear_color, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(config.shaders.fragment, PathBuf::from("b.spv"));
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let result = Config::from_toml("[window]\nwidth = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_shader_path_rejected() {
        let result = Config::from_toml("[shaders]\nvertex = \"\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Config::from_toml("[window]\nfullscreen = true\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("definitely/not/here/vkframe.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
