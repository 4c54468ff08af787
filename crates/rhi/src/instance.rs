//! Vulkan instance management.
//!
//! This module handles VkInstance creation, validation layers, and the debug
//! messenger that forwards validation output into `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use vkframe_rhi::instance::{Instance, InstanceDesc};
//!
//! let desc = InstanceDesc {
//!     application_name: "Hello Vulkan",
//!     enable_validation: cfg!(debug_assertions),
//!     surface_extensions: Vec::new(),
//! };
//! let instance = Instance::new(&desc).expect("Failed to create Vulkan instance");
//! let _vk_instance = instance.handle();
//! ```

use std::ffi::{CStr, CString, c_char};

use ash::{Entry, vk};
use tracing::{debug, error, info, warn};

use crate::error::{RhiError, RhiResult};

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Parameters for [`Instance::new`].
pub struct InstanceDesc<'a> {
    /// Application name reported to the driver.
    pub application_name: &'a str,
    /// Request the validation layer and a debug messenger.
    pub enable_validation: bool,
    /// Surface extensions required by the window system, as returned by
    /// `ash_window::enumerate_required_extensions`.
    pub surface_extensions: Vec<*const c_char>,
}

/// Vulkan instance wrapper with optional validation layer support.
///
/// Owns the loader entry, the instance and, when validation is active, the
/// debug messenger. Everything is destroyed on drop, messenger first.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils extension loader (only present when validation is enabled)
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    /// Debug messenger handle (only present when validation is enabled)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance targeting API version 1.0.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Vulkan library cannot be loaded
    /// - The application name contains an interior NUL byte
    /// - Instance creation fails
    /// - Debug messenger setup fails (when validation is enabled)
    pub fn new(desc: &InstanceDesc<'_>) -> RhiResult<Self> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            desc.enable_validation && Self::is_validation_layer_available(&entry)?;
        if desc.enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let application_name = CString::new(desc.application_name).map_err(|e| {
            RhiError::InvalidHandle(format!("Invalid application name: {}", e))
        })?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extensions = desc.surface_extensions.clone();
        if extensions.is_empty() {
            extensions = Self::fallback_surface_extensions();
        }
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!(
            "Vulkan instance created for '{}' with {} extension(s)",
            desc.application_name,
            extensions.len()
        );

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => messenger,
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            };
            info!("Validation layers enabled");
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Surface extensions used when the window system reported none.
    fn fallback_surface_extensions() -> Vec<*const c_char> {
        let mut extensions = vec![ash::khr::surface::NAME.as_ptr()];

        #[cfg(target_os = "windows")]
        extensions.push(ash::khr::win32_surface::NAME.as_ptr());

        #[cfg(target_os = "linux")]
        {
            extensions.push(ash::khr::xlib_surface::NAME.as_ptr());
            extensions.push(ash::khr::wayland_surface::NAME.as_ptr());
        }

        #[cfg(target_os = "macos")]
        extensions.push(ash::ext::metal_surface::NAME.as_ptr());

        extensions
    }

    fn is_validation_layer_available(entry: &Entry) -> RhiResult<bool> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        let found = available_layers.iter().any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        });

        debug!("Validation layer available: {}", found);
        Ok(found)
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> RhiResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };
        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Routes validation layer messages into `tracing`.
///
/// # Safety
///
/// Called by the Vulkan loader with a valid (or null) callback data pointer.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            error!("[Vulkan {}] {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            warn!("[Vulkan {}] {}", type_str, message);
        }
        _ => {
            debug!("[Vulkan {}] {}", type_str, message);
        }
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(enable_validation: bool) -> InstanceDesc<'static> {
        InstanceDesc {
            application_name: "vkframe tests",
            enable_validation,
            surface_extensions: Vec::new(),
        }
    }

    #[test]
    fn test_instance_creation_without_validation() {
        // Requires a Vulkan loader
        match Instance::new(&desc(false)) {
            Ok(instance) => assert_ne!(instance.handle().handle(), vk::Instance::null()),
            Err(RhiError::LoadingError(_)) => {
                eprintln!("Skipping test: Vulkan not available");
            }
            Err(RhiError::VulkanError(e)) => {
                // Loader present but no surface-capable ICD
                eprintln!("Skipping test: instance creation failed ({:?})", e);
            }
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_invalid_application_name() {
        let desc = InstanceDesc {
            application_name: "bad\0name",
            enable_validation: false,
            surface_extensions: Vec::new(),
        };
        match Instance::new(&desc) {
            Err(RhiError::InvalidHandle(_)) | Err(RhiError::LoadingError(_)) => {}
            Err(e) => panic!("Unexpected error: {:?}", e),
            Ok(_) => panic!("Interior NUL should be rejected"),
        }
    }

    #[test]
    fn test_fallback_surface_extensions() {
        let extensions = Instance::fallback_surface_extensions();
        assert!(!extensions.is_empty());
        assert_eq!(extensions[0], ash::khr::surface::NAME.as_ptr());

        #[cfg(target_os = "linux")]
        assert_eq!(extensions.len(), 3);
    }
}
