//! Notification adapters
//!
//! Implementations of the `Notifier` port.

pub mod log_notifier;

pub use log_notifier::LogNotifier;
