// src/gui/mod.rs
//! Presentation layer interface
//!
//! The service and the client report progress through a [`Presenter`]. A
//! graphical front-end would draw windows and tray icons; the
//! [`HeadlessGui`] shipped here writes everything to the log instead.

/// Log-backed presenter for running without a window
pub mod headless;

pub use headless::HeadlessGui;

use async_trait::async_trait;

/// Callbacks the service and client use to reach the operator
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Prints a line to the operator's output pane
    fn print(&self, message: &str);

    /// Updates the one-line status display
    fn update_status(&self, message: &str);

    /// Switches the tray icon (`"active"`, `"idle"`, `"error"`, ...)
    fn change_icon(&self, icon: &str);

    /// Tries to get the operator's attention (flash, notification, sound)
    fn grab_attention(&self, sound: bool);

    /// Marks the window as closed by the operator
    fn close(&self);

    /// True once the operator asked to close
    fn close_requested(&self) -> bool;

    /// Clears a close request so the window stays up for inspection
    fn prevent_close(&self);

    /// Waits until the operator has dismissed the window
    async fn wait_until_closed(&self);

    /// Stops background presentation work (timers, animations)
    fn stop(&self);

    /// Tears the window down
    fn close_window(&self);
}
