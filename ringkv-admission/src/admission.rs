use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Bounded in-flight counter for one tier (gateway or node).
///
/// `try_acquire` atomically tests the cap and increments in one
/// `fetch_update`; the returned [`InFlightGuard`] decrements on drop so
/// early returns and panics in handler code can't leak a permit.
pub struct Admission {
    in_flight: AtomicU32,
    cap: u32,
}

impl Admission {
    pub fn new(cap: u32) -> Arc<Self> {
        Arc::new(Self { in_flight: AtomicU32::new(0), cap })
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `None` (shed the request) if the tier is already at its cap.
    pub fn try_acquire(self: &Arc<Self>) -> Option<InFlightGuard> {
        let result = self.in_flight.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            if n >= self.cap {
                None
            } else {
                Some(n + 1)
            }
        });
        result.ok().map(|_| InFlightGuard { admission: self.clone() })
    }
}

pub struct InFlightGuard {
    admission: Arc<Admission>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.admission.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
