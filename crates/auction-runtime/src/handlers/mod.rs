//! # Event Handlers
//!
//! Bus consumers for each service: the arbitration consumers feeding the
//! dispatcher, and the notification relay.

pub mod arbitration;
pub mod relay;

pub use arbitration::ArbitrationConsumer;
pub use relay::{notification_for, NotificationRelay};
