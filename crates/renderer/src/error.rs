//! Renderer error type.

use thiserror::Error;

use vkframe_rhi::RhiError;

/// How the application should react to a [`RendererError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Startup cannot continue; exit non-zero.
    FatalInit,
    /// The current frame was skipped; the loop keeps going.
    TransientFrame,
}

/// Errors raised while creating or driving the renderer.
#[derive(Error, Debug)]
pub enum RendererError {
    /// A Vulkan object or call failed.
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// The window or its surface failed.
    #[error(transparent)]
    Platform(#[from] vkframe_core::Error),
}

impl RendererError {
    /// Classifies an error raised by [`crate::Renderer::render_frame`].
    ///
    /// Every error that reaches the caller from a frame is transient: the
    /// frame is skipped and the next one retries. Errors from
    /// [`crate::Renderer::new`] are fatal regardless of this value.
    pub fn class(&self) -> ErrorClass {
        match self {
            RendererError::Platform(_) => ErrorClass::FatalInit,
            RendererError::Rhi(RhiError::LoadingError(_) | RhiError::NoSuitableGpu) => {
                ErrorClass::FatalInit
            }
            RendererError::Rhi(_) => ErrorClass::TransientFrame,
        }
    }
}

/// Result type for renderer operations.
pub type RendererResult<T> = std::result::Result<T, RendererError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn test_frame_errors_are_transient() {
        let err = RendererError::from(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST));
        assert_eq!(err.class(), ErrorClass::TransientFrame);

        let err = RendererError::from(RhiError::SwapchainError("zero extent".to_string()));
        assert_eq!(err.class(), ErrorClass::TransientFrame);
    }

    #[test]
    fn test_setup_errors_are_fatal() {
        assert_eq!(
            RendererError::from(RhiError::NoSuitableGpu).class(),
            ErrorClass::FatalInit
        );
        assert_eq!(
            RendererError::from(vkframe_core::Error::Surface("no display".to_string())).class(),
            ErrorClass::FatalInit
        );
    }

    #[test]
    fn test_display_is_transparent() {
        let err = RendererError::from(RhiError::NoSuitableGpu);
        assert_eq!(err.to_string(), "No suitable GPU found");
    }
}
