//! httpcheck-report — turns an [`httpcheck_core::Outcome`] into a
//! published result event.
//!
//! The reporter serializes a flat [`ReportEvent`] (config fields plus the
//! verdict), submits it to one topic and waits for delivery confirmation
//! for at most the drain timeout. Delivery is not retried; a failure here
//! fails the run.

pub mod error;
pub mod event;
pub mod publisher;
pub mod reporter;

pub use error::{PublishError, PublishResult};
pub use event::ReportEvent;
pub use publisher::{Delivery, KafkaPublisher, MemoryPublisher, Message, PublishFuture, Publisher};
pub use reporter::{Reporter, DEFAULT_DRAIN_TIMEOUT};
