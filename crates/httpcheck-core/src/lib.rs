//! httpcheck-core — shared types and configuration for httpcheck.
//!
//! A run is described by a [`CheckConfig`] (what to probe) and an optional
//! [`KafkaConfig`] (where to report). The prober produces an [`Outcome`],
//! which the reporter turns into the published event.

pub mod config;
pub mod error;
pub mod types;

pub use config::{RawSettings, Settings};
pub use error::{ConfigError, ConfigResult, FieldError};
pub use types::*;
