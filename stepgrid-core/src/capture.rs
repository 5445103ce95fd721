use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::input::PointerId;

/// Shared "a gesture owns the pointer" flag. Hosts poll it to decide
/// whether to listen for move/up events outside the grid surface.
#[derive(Clone, Debug, Default)]
pub struct CaptureFlag(Arc<AtomicBool>);

impl CaptureFlag {
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn acquire(&self, pointer: PointerId) -> PointerCapture {
        self.0.store(true, Ordering::Release);
        PointerCapture {
            flag: self.0.clone(),
            pointer,
        }
    }
}

/// Raised capture for one gesture; lowering happens on drop.
#[derive(Debug)]
pub struct PointerCapture {
    flag: Arc<AtomicBool>,
    pointer: PointerId,
}

impl PointerCapture {
    pub fn pointer(&self) -> PointerId {
        self.pointer
    }
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_lowers_on_drop() {
        let flag = CaptureFlag::default();
        assert!(!flag.is_active());
        let capture = flag.acquire(7);
        assert!(flag.is_active());
        assert_eq!(capture.pointer(), 7);
        drop(capture);
        assert!(!flag.is_active());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = CaptureFlag::default();
        let observer = flag.clone();
        let capture = flag.acquire(1);
        assert!(observer.is_active());
        drop(capture);
        assert!(!observer.is_active());
    }
}
