//! Deferred resize notification shared between the window and the renderer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared "the framebuffer was resized" flag.
///
/// The window raises it from its event handler; the frame driver consumes it
/// once per frame, after presenting. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct ResizeSignal(Arc<AtomicBool>);

impl ResizeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the framebuffer as resized.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether a resize was signaled and clears the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Reads the flag without clearing it.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_flag() {
        let signal = ResizeSignal::new();
        assert!(!signal.take());

        signal.raise();
        assert!(signal.is_raised());
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn test_repeated_raises_coalesce() {
        let signal = ResizeSignal::new();
        signal.raise();
        signal.raise();
        assert!(signal.take());
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_clones_share_state() {
        let window_side = ResizeSignal::new();
        let driver_side = window_side.clone();

        window_side.raise();
        assert!(driver_side.take());
        assert!(!window_side.is_raised());
    }

    #[test]
    fn test_raise_from_another_thread() {
        let signal = ResizeSignal::new();
        let remote = signal.clone();

        std::thread::spawn(move || remote.raise()).join().unwrap();
        assert!(signal.take());
    }
}
