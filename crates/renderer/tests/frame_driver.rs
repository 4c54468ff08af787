//! Frame driver scenarios against an in-memory backend.

use std::collections::VecDeque;

use vkframe_platform::ResizeSignal;
use vkframe_renderer::{FrameBackend, FrameDriver, FrameOutcome, MAX_FRAMES_IN_FLIGHT};
use vkframe_rhi::swapchain::{AcquireOutcome, PresentOutcome};
use vkframe_rhi::{RhiError, RhiResult, vk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Wait(usize),
    Acquire(usize),
    Record(usize, u32),
    Submit(usize),
    Present(usize, u32),
    Recreate,
    Abandon(usize),
}

/// Records every call and models each slot fence as "armed" between submit
/// and the next wait.
struct MockBackend {
    image_count: usize,
    next_image: u32,
    generation: u32,
    calls: Vec<Call>,
    recorded_generations: Vec<u32>,
    acquire_script: VecDeque<RhiResult<AcquireOutcome>>,
    present_script: VecDeque<RhiResult<PresentOutcome>>,
    record_failures: usize,
    recreate_failures: usize,
    armed: [bool; MAX_FRAMES_IN_FLIGHT],
}

impl MockBackend {
    fn new(image_count: usize) -> Self {
        Self {
            image_count,
            next_image: 0,
            generation: 0,
            calls: Vec::new(),
            recorded_generations: Vec::new(),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            record_failures: 0,
            recreate_failures: 0,
            armed: [false; MAX_FRAMES_IN_FLIGHT],
        }
    }

    fn recorded_slots(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Record(slot, _) => Some(*slot),
                _ => None,
            })
            .collect()
    }

    fn count(&self, wanted: Call) -> usize {
        self.calls.iter().filter(|&&call| call == wanted).count()
    }

    fn position(&self, wanted: Call) -> Option<usize> {
        self.calls.iter().position(|&call| call == wanted)
    }
}

impl FrameBackend for MockBackend {
    fn wait_for_slot(&mut self, slot: usize) -> RhiResult<()> {
        self.calls.push(Call::Wait(slot));
        self.armed[slot] = false;
        Ok(())
    }

    fn acquire(&mut self, slot: usize) -> RhiResult<AcquireOutcome> {
        self.calls.push(Call::Acquire(slot));
        if let Some(scripted) = self.acquire_script.pop_front() {
            return scripted;
        }
        let image_index = self.next_image % self.image_count as u32;
        self.next_image += 1;
        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn record(&mut self, slot: usize, image: u32) -> RhiResult<()> {
        assert!(
            !self.armed[slot],
            "slot {} re-recorded before its fence was observed signaled",
            slot
        );
        self.calls.push(Call::Record(slot, image));
        if self.record_failures > 0 {
            self.record_failures -= 1;
            return Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_HOST_MEMORY));
        }
        self.recorded_generations.push(self.generation);
        Ok(())
    }

    fn submit(&mut self, slot: usize) -> RhiResult<()> {
        self.calls.push(Call::Submit(slot));
        self.armed[slot] = true;
        Ok(())
    }

    fn present(&mut self, slot: usize, image: u32) -> RhiResult<PresentOutcome> {
        self.calls.push(Call::Present(slot, image));
        self.present_script
            .pop_front()
            .unwrap_or(Ok(PresentOutcome::Presented))
    }

    fn recreate(&mut self) -> RhiResult<usize> {
        self.calls.push(Call::Recreate);
        if self.recreate_failures > 0 {
            self.recreate_failures -= 1;
            return Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }
        // The device is idle after recreation
        self.armed = [false; MAX_FRAMES_IN_FLIGHT];
        self.generation += 1;
        self.next_image = 0;
        Ok(self.image_count)
    }

    fn abandon(&mut self, slot: usize) -> RhiResult<()> {
        self.calls.push(Call::Abandon(slot));
        Ok(())
    }
}

fn presented_slot(outcome: FrameOutcome) -> usize {
    match outcome {
        FrameOutcome::Presented { slot, .. } => slot,
        FrameOutcome::SurfaceStale => panic!("expected a presented frame"),
    }
}

#[test]
fn test_five_frames_cycle_slots() {
    let mut backend = MockBackend::new(3);
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    let slots: Vec<usize> = (0..5)
        .map(|_| presented_slot(driver.tick(&mut backend).unwrap()))
        .collect();

    assert_eq!(slots, vec![0, 1, 0, 1, 0]);
    assert_eq!(backend.recorded_slots(), vec![0, 1, 0, 1, 0]);
    assert_eq!(backend.count(Call::Recreate), 0);
    assert_eq!(driver.stats().presented, 5);
    assert_eq!(driver.stats().skipped, 0);
}

#[test]
fn test_out_of_date_present_rebuilds_after_presenting() {
    let mut backend = MockBackend::new(3);
    backend.present_script = VecDeque::from([
        Ok(PresentOutcome::Presented),
        Ok(PresentOutcome::Presented),
        Ok(PresentOutcome::OutOfDate),
    ]);
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    driver.tick(&mut backend).unwrap();
    driver.tick(&mut backend).unwrap();

    let third = driver.tick(&mut backend).unwrap();
    assert_eq!(
        third,
        FrameOutcome::Presented {
            slot: 0,
            image_index: 2,
            rebuilt: true
        }
    );
    let present = backend.position(Call::Present(0, 2)).unwrap();
    let recreate = backend.position(Call::Recreate).unwrap();
    assert!(present < recreate);

    // Frame 4 uses the rebuilt chain and the next slot
    let fourth = driver.tick(&mut backend).unwrap();
    assert_eq!(presented_slot(fourth), 1);
    assert_eq!(backend.recorded_generations, vec![0, 0, 0, 1]);
    assert_eq!(driver.stats().rebuilds, 1);
}

#[test]
fn test_out_of_date_acquire_keeps_slot() {
    let mut backend = MockBackend::new(3);
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    assert_eq!(presented_slot(driver.tick(&mut backend).unwrap()), 0);

    backend
        .acquire_script
        .push_back(Ok(AcquireOutcome::OutOfDate));
    assert_eq!(
        driver.tick(&mut backend).unwrap(),
        FrameOutcome::SurfaceStale
    );
    assert_eq!(driver.current_slot(), 1);
    assert_eq!(backend.count(Call::Recreate), 1);
    assert_eq!(backend.count(Call::Submit(1)), 0);

    assert_eq!(presented_slot(driver.tick(&mut backend).unwrap()), 1);
    assert_eq!(presented_slot(driver.tick(&mut backend).unwrap()), 0);
    assert_eq!(backend.recorded_slots(), vec![0, 1, 0]);
    assert_eq!(driver.stats().skipped, 1);
}

#[test]
fn test_resize_flag_read_after_present() {
    let mut backend = MockBackend::new(3);
    let resize = ResizeSignal::new();
    let mut driver = FrameDriver::new(3, resize.clone());

    driver.tick(&mut backend).unwrap();
    assert_eq!(backend.count(Call::Recreate), 0);

    resize.raise();
    let outcome = driver.tick(&mut backend).unwrap();
    assert!(matches!(
        outcome,
        FrameOutcome::Presented { rebuilt: true, .. }
    ));
    let present = backend.position(Call::Present(1, 1)).unwrap();
    let recreate = backend.position(Call::Recreate).unwrap();
    assert!(present < recreate);
    assert!(!resize.is_raised());

    driver.tick(&mut backend).unwrap();
    assert_eq!(backend.count(Call::Recreate), 1);
}

#[test]
fn test_resize_flag_survives_failed_present() {
    let mut backend = MockBackend::new(3);
    backend
        .present_script
        .push_back(Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST)));
    let resize = ResizeSignal::new();
    let mut driver = FrameDriver::new(3, resize.clone());

    resize.raise();
    assert!(driver.tick(&mut backend).is_err());
    assert!(resize.is_raised());
    assert_eq!(backend.count(Call::Recreate), 0);

    let outcome = driver.tick(&mut backend).unwrap();
    assert!(matches!(
        outcome,
        FrameOutcome::Presented { rebuilt: true, .. }
    ));
}

#[test]
fn test_suboptimal_acquire_rebuilds_after_present() {
    let mut backend = MockBackend::new(3);
    backend.acquire_script.push_back(Ok(AcquireOutcome::Acquired {
        image_index: 0,
        suboptimal: true,
    }));
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    let outcome = driver.tick(&mut backend).unwrap();
    assert_eq!(
        outcome,
        FrameOutcome::Presented {
            slot: 0,
            image_index: 0,
            rebuilt: true
        }
    );
    let present = backend.position(Call::Present(0, 0)).unwrap();
    assert!(present < backend.position(Call::Recreate).unwrap());
}

#[test]
fn test_double_rebuild_is_idempotent() {
    let mut backend = MockBackend::new(3);
    let mut driver = FrameDriver::new(3, ResizeSignal::new());
    driver.tick(&mut backend).unwrap();

    driver.rebuild(&mut backend).unwrap();
    let first = (
        driver.current_slot(),
        driver.images_in_flight().len(),
        driver.is_in_flight(0),
        driver.is_in_flight(1),
        driver.rebuild_pending(),
    );

    driver.rebuild(&mut backend).unwrap();
    let second = (
        driver.current_slot(),
        driver.images_in_flight().len(),
        driver.is_in_flight(0),
        driver.is_in_flight(1),
        driver.rebuild_pending(),
    );

    assert_eq!(first, second);
    assert_eq!(first, (1, 3, false, false, false));
    assert!((0..3).all(|i| driver.images_in_flight().owner(i).is_none()));
}

#[test]
fn test_rebuild_resizes_image_map() {
    let mut backend = MockBackend::new(2);
    let resize = ResizeSignal::new();
    let mut driver = FrameDriver::new(2, resize.clone());

    driver.tick(&mut backend).unwrap();
    assert_eq!(driver.images_in_flight().owner(0), Some(0));

    backend.image_count = 4;
    resize.raise();
    driver.tick(&mut backend).unwrap();

    assert_eq!(driver.images_in_flight().len(), 4);
    assert!((0..4).all(|i| driver.images_in_flight().owner(i).is_none()));
}

#[test]
fn test_transient_present_error_still_advances() {
    let mut backend = MockBackend::new(3);
    backend
        .present_script
        .push_back(Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST)));
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    assert!(driver.tick(&mut backend).is_err());
    assert_eq!(driver.current_slot(), 1);
    assert!(driver.is_in_flight(0));
    assert!(!driver.rebuild_pending());

    assert_eq!(presented_slot(driver.tick(&mut backend).unwrap()), 1);
    assert_eq!(driver.stats().skipped, 1);
    assert_eq!(driver.stats().presented, 1);
}

#[test]
fn test_record_failure_abandons_acquired_image() {
    let mut backend = MockBackend::new(3);
    backend.record_failures = 1;
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    assert!(driver.tick(&mut backend).is_err());
    assert_eq!(driver.current_slot(), 0);
    assert!(!driver.is_in_flight(0));
    assert!(driver.rebuild_pending());
    assert_eq!(backend.count(Call::Abandon(0)), 1);
    assert_eq!(backend.count(Call::Present(0, 0)), 0);

    // The next tick rebuilds first, then renders from the same slot
    assert_eq!(presented_slot(driver.tick(&mut backend).unwrap()), 0);
    let recreate = backend.position(Call::Recreate).unwrap();
    let second_acquire = backend
        .calls
        .iter()
        .rposition(|&call| call == Call::Acquire(0))
        .unwrap();
    assert!(recreate < second_acquire);
}

#[test]
fn test_failed_rebuild_is_retried_before_acquire() {
    let mut backend = MockBackend::new(3);
    backend
        .present_script
        .push_back(Ok(PresentOutcome::OutOfDate));
    backend.recreate_failures = 1;
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    assert_eq!(
        driver.tick(&mut backend).unwrap(),
        FrameOutcome::Presented {
            slot: 0,
            image_index: 0,
            rebuilt: false
        }
    );
    assert!(driver.rebuild_pending());
    assert_eq!(driver.stats().presented, 1);
    assert_eq!(driver.stats().skipped, 0);
    assert_eq!(driver.stats().rebuilds, 0);

    let acquires_before = backend.count(Call::Acquire(1));
    assert_eq!(presented_slot(driver.tick(&mut backend).unwrap()), 1);
    assert!(!driver.rebuild_pending());
    assert_eq!(backend.count(Call::Recreate), 2);
    assert_eq!(backend.count(Call::Acquire(1)), acquires_before + 1);
    assert_eq!(backend.recorded_generations, vec![0, 1]);
}

#[test]
fn test_waits_on_image_owned_by_other_slot() {
    let mut backend = MockBackend::new(3);
    backend.acquire_script = VecDeque::from([
        Ok(AcquireOutcome::Acquired {
            image_index: 0,
            suboptimal: false,
        }),
        Ok(AcquireOutcome::Acquired {
            image_index: 1,
            suboptimal: false,
        }),
        Ok(AcquireOutcome::Acquired {
            image_index: 1,
            suboptimal: false,
        }),
    ]);
    let mut driver = FrameDriver::new(3, ResizeSignal::new());

    for _ in 0..2 {
        driver.tick(&mut backend).unwrap();
    }
    backend.calls.clear();

    // Slot 0 acquires image 1, last used by slot 1 which is still in flight
    driver.tick(&mut backend).unwrap();
    assert_eq!(
        backend.calls,
        vec![
            Call::Wait(0),
            Call::Acquire(0),
            Call::Wait(1),
            Call::Record(0, 1),
            Call::Submit(0),
            Call::Present(0, 1),
        ]
    );
    assert_eq!(driver.images_in_flight().owner(1), Some(0));
    assert!(!driver.is_in_flight(1));
}

#[test]
fn test_slot_never_rerecorded_while_armed() {
    let mut backend = MockBackend::new(3);
    let resize = ResizeSignal::new();
    let mut driver = FrameDriver::new(3, resize.clone());

    for frame in 0..40 {
        if frame % 7 == 3 {
            resize.raise();
        }
        if frame % 11 == 5 {
            backend
                .acquire_script
                .push_back(Ok(AcquireOutcome::OutOfDate));
        }
        // MockBackend::record panics on a violation
        driver.tick(&mut backend).unwrap();
    }

    let slots = backend.recorded_slots();
    assert!(slots.windows(2).all(|pair| pair[1] == (pair[0] + 1) % MAX_FRAMES_IN_FLIGHT));
}
