//! Terminal stand-in for the camera preview.

use crate::camera::{FeedInfo, PreviewSurface};

/// Prints feed attach and detach events to stderr.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    attached: Option<FeedInfo>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewSurface for TerminalSurface {
    fn attach(&mut self, feed: &FeedInfo) {
        eprintln!("Camera live: {} ({})", feed.label, feed.resolution);
        self.attached = Some(feed.clone());
    }

    fn detach(&mut self) {
        if let Some(feed) = self.attached.take() {
            eprintln!("Camera released: {}", feed.label);
        }
    }
}
