//! Mock panel layout.

use std::sync::atomic::{AtomicUsize, Ordering};
use waiting_room::lifecycle::PanelLayout;

/// Panel layout that counts close requests.
#[derive(Debug, Default)]
pub struct MockPanelLayout {
    closes: AtomicUsize,
}

impl MockPanelLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of close requests received.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl PanelLayout for MockPanelLayout {
    fn close_panel(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
