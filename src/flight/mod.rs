use std::sync::atomic::{AtomicBool, Ordering};

/// Single-flight latch: at most one guard exists at a time. New attempts are
/// rejected, not queued.
#[derive(Debug, Default)]
pub struct Flight {
    busy: AtomicBool,
}

impl Flight {
    pub fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { busy: &self.busy })
    }

    pub fn is_active(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the latch on drop, including when the owning future is dropped
/// mid-await.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
