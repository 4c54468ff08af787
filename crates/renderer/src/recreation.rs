//! Waiting out a minimized window before a swapchain rebuild.

use tracing::debug;

use vkframe_platform::Window;

/// The window-side view needed during recreation.
pub trait DrawableSurface {
    /// Current drawable size in pixels.
    fn drawable_size(&self) -> (u32, u32);

    /// Blocks until events arrive or a bounded timeout passes.
    fn wait_events(&mut self);

    /// Whether the user asked to close the window.
    fn should_close(&self) -> bool;
}

impl DrawableSurface for Window {
    fn drawable_size(&self) -> (u32, u32) {
        self.framebuffer_size()
    }

    fn wait_events(&mut self) {
        Window::wait_events(self)
    }

    fn should_close(&self) -> bool {
        Window::should_close(self)
    }
}

/// Blocks until both drawable dimensions are non-zero.
///
/// Returns `None` if the window is closed while waiting.
pub fn wait_for_drawable<S: DrawableSurface + ?Sized>(surface: &mut S) -> Option<(u32, u32)> {
    let mut logged = false;
    loop {
        let (width, height) = surface.drawable_size();
        if width != 0 && height != 0 {
            return Some((width, height));
        }
        if surface.should_close() {
            return None;
        }
        if !logged {
            debug!("Drawable area is {}x{}, waiting for events", width, height);
            logged = true;
        }
        surface.wait_events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedSurface {
        sizes: Vec<(u32, u32)>,
        waits: usize,
        close_after: Option<usize>,
    }

    impl DrawableSurface for ScriptedSurface {
        fn drawable_size(&self) -> (u32, u32) {
            self.sizes[self.waits.min(self.sizes.len() - 1)]
        }

        fn wait_events(&mut self) {
            self.waits += 1;
        }

        fn should_close(&self) -> bool {
            self.close_after.is_some_and(|n| self.waits >= n)
        }
    }

    #[test]
    fn test_returns_immediately_when_visible() {
        let mut surface = ScriptedSurface {
            sizes: vec![(800, 600)],
            waits: 0,
            close_after: None,
        };
        assert_eq!(wait_for_drawable(&mut surface), Some((800, 600)));
        assert_eq!(surface.waits, 0);
    }

    #[test]
    fn test_blocks_while_minimized() {
        let mut surface = ScriptedSurface {
            sizes: vec![(0, 0), (0, 0), (640, 0), (640, 480)],
            waits: 0,
            close_after: None,
        };
        assert_eq!(wait_for_drawable(&mut surface), Some((640, 480)));
        assert_eq!(surface.waits, 3);
    }

    #[test]
    fn test_close_while_minimized() {
        let mut surface = ScriptedSurface {
            sizes: vec![(0, 0)],
            waits: 0,
            close_after: Some(2),
        };
        assert_eq!(wait_for_drawable(&mut surface), None);
        assert_eq!(surface.waits, 2);
    }
}
