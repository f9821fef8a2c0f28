// src/gui/headless.rs
use crate::gui::Presenter;
use crate::utils::logging::LogSink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// Presenter that routes every callback to the log
///
/// There is no window to wait for, so [`Presenter::wait_until_closed`]
/// returns immediately; tray icons and attention requests are no-ops.
pub struct HeadlessGui {
    sink: LogSink,
    close_requested: AtomicBool,
}

impl HeadlessGui {
    /// Creates a headless presenter logging under `sink`
    pub fn new(sink: LogSink) -> Self {
        log::debug!(target: sink.target(), "Starting in headless mode");
        Self {
            sink,
            close_requested: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Presenter for HeadlessGui {
    fn print(&self, message: &str) {
        log::info!(target: self.sink.target(), "{}", message);
    }

    fn update_status(&self, message: &str) {
        log::info!(target: self.sink.target(), "{}", message);
    }

    fn change_icon(&self, _icon: &str) {}

    fn grab_attention(&self, _sound: bool) {}

    fn close(&self) {
        self.close_requested.store(true, Ordering::SeqCst);
    }

    fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    fn prevent_close(&self) {
        self.close_requested.store(false, Ordering::SeqCst);
    }

    async fn wait_until_closed(&self) {}

    fn stop(&self) {}

    fn close_window(&self) {
        log::debug!(target: self.sink.target(), "Headless presenter closed");
    }
}
