//! Swapchain selection policies.
//!
//! Each policy is a pure function over an ordered preference list and the set
//! the surface actually offers, with a defined fallback. None of them touch
//! the driver, so they are tested without a Vulkan context.

use ash::vk;

/// Surface formats in order of preference.
pub const PREFERRED_SURFACE_FORMATS: &[vk::SurfaceFormatKHR] = &[vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
}];

/// Present modes in order of preference. FIFO is the fallback and is always
/// supported, so it is not listed.
pub const PREFERRED_PRESENT_MODES: &[vk::PresentModeKHR] = &[vk::PresentModeKHR::MAILBOX];

/// Returns the first preference that is available.
pub fn first_preferred<T: PartialEq + Copy>(preferences: &[T], available: &[T]) -> Option<T> {
    preferences
        .iter()
        .copied()
        .find(|preferred| available.contains(preferred))
}

/// Chooses a surface format: the first preferred format offered by the
/// surface, otherwise the first format the surface lists.
///
/// Returns `None` only when `available` is empty.
pub fn choose_surface_format(
    preferences: &[vk::SurfaceFormatKHR],
    available: &[vk::SurfaceFormatKHR],
) -> Option<vk::SurfaceFormatKHR> {
    first_preferred(preferences, available).or_else(|| available.first().copied())
}

/// Chooses a present mode, falling back to FIFO.
pub fn choose_present_mode(
    preferences: &[vk::PresentModeKHR],
    available: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    first_preferred(preferences, available).unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Chooses the swapchain extent.
///
/// A current extent of `u32::MAX` means the surface lets the application
/// decide; the drawable size is then clamped into the surface limits.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    drawable: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    // Upper bound first, so inverted limits resolve to the minimum
    let (width, height) = drawable;
    let (min, max) = (capabilities.min_image_extent, capabilities.max_image_extent);
    vk::Extent2D {
        width: width.min(max.width).max(min.width),
        height: height.min(max.height).max(min.height),
    }
}

/// One image more than the minimum, capped by the maximum. A maximum of 0
/// means unbounded.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

/// How swapchain images are shared between queue families.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharingPlan {
    pub mode: vk::SharingMode,
    /// Families listed in the create info; empty for exclusive ownership.
    pub queue_family_indices: Vec<u32>,
}

/// Exclusive ownership when graphics and present share a family, otherwise
/// concurrent sharing across both.
pub fn choose_sharing(graphics_family: u32, present_family: u32) -> SharingPlan {
    if graphics_family == present_family {
        SharingPlan {
            mode: vk::SharingMode::EXCLUSIVE,
            queue_family_indices: Vec::new(),
        }
    } else {
        SharingPlan {
            mode: vk::SharingMode::CONCURRENT,
            queue_family_indices: vec![graphics_family, present_family],
        }
    }
}
