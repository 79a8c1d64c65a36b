//! HelpHub event bus and email delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the envelope handlers publish after a state change.
//! - [`delivery`]: external delivery channels (SMTP email).

pub mod bus;
pub mod delivery;

pub use bus::{DomainEvent, EventBus};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
