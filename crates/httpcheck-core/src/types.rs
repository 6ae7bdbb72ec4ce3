//! Domain types shared by the prober and the reporter.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default value of the informational `uptime_sla` field.
pub const DEFAULT_UPTIME_SLA: &str = "100";

/// Default value of the informational `check_interval_in_seconds` field.
pub const DEFAULT_CHECK_INTERVAL_SECONDS: &str = "86400";

/// Largest accepted `NUM_RETRIES`; one more attempt must still fit in a `u32`.
pub const MAX_NUM_RETRIES: u32 = u32::MAX - 1;

/// Default Kafka topic for result events.
pub const DEFAULT_TOPIC: &str = "httpcheck";

/// Static description of the check to run. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Human-readable label for the target.
    pub name: String,
    /// Absolute http(s) URL to probe.
    pub uri: String,
    /// Recorded in the event only. The probe runs regardless.
    pub is_paused: bool,
    /// Extra attempts after the first one.
    pub num_retries: u32,
    /// Maximum latency for an attempt to count as a success.
    pub response_time_sla: Duration,
    /// When false, TLS certificates are not verified.
    pub use_ssl: bool,
    /// Metadata only; nothing schedules on it.
    pub check_interval_in_seconds: String,
    /// Metadata only.
    pub uptime_sla: String,
}

impl CheckConfig {
    /// Upper bound on attempts for this config.
    ///
    /// Equals `num_retries + 1` for every value up to [`MAX_NUM_RETRIES`],
    /// which is all that config validation lets through. Hand-built configs
    /// with `u32::MAX` retries are capped at `u32::MAX` attempts.
    pub fn max_attempts(&self) -> u32 {
        self.num_retries.saturating_add(1)
    }
}

/// Kafka producer settings for the reporter.
#[derive(Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    /// e.g. `SASL_PLAINTEXT`. Left to librdkafka's default when unset.
    pub security_protocol: Option<String>,
    /// e.g. `PLAIN`.
    pub sasl_mechanism: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
}

impl fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("topic", &self.topic)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("sasl_username", &self.sasl_username)
            .field("sasl_password", &self.sasl_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Success/failure marker carried in `response_status_code`.
///
/// These are sentinels, not the HTTP status of the last attempt: a run
/// that exhausts its retries reports `Down` even if the endpoint answered
/// 500 or never answered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusSentinel {
    #[serde(rename = "200")]
    Up,
    #[serde(rename = "404")]
    Down,
}

impl StatusSentinel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSentinel::Up => "200",
            StatusSentinel::Down => "404",
        }
    }
}

impl fmt::Display for StatusSentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict of one probe run, handed from the prober to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub succeeded: bool,
    pub final_status_code: StatusSentinel,
    /// Elapsed time of the last attempt made.
    pub final_elapsed: Duration,
    /// Always in `1..=num_retries + 1`.
    pub attempts_made: u32,
}

impl Outcome {
    /// Outcome for a run whose attempt number `attempts_made` met the SLA.
    pub fn up(final_elapsed: Duration, attempts_made: u32) -> Self {
        Self {
            succeeded: true,
            final_status_code: StatusSentinel::Up,
            final_elapsed,
            attempts_made,
        }
    }

    /// Outcome for a run that exhausted its retries.
    pub fn down(final_elapsed: Duration, attempts_made: u32) -> Self {
        Self {
            succeeded: false,
            final_status_code: StatusSentinel::Down,
            final_elapsed,
            attempts_made,
        }
    }
}
