use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for [`Sorter::sort`](crate::Sorter::sort).
///
/// Clones share one flag, so a token handed to `sort` can be tripped from
/// another thread. Finalization polls it before each group merge and
/// between merged records; cancellation therefore lands at the next record
/// boundary, never mid-frame.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Irreversible for this token and its clones.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
