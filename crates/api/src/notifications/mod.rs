//! Notification delivery.
//!
//! The [`NotificationDispatcher`] subscribes to the event bus and emails the
//! people each event names.

pub mod dispatcher;

pub use dispatcher::NotificationDispatcher;
