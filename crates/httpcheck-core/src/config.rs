//! Configuration loading.
//!
//! Settings come from two layers: an optional TOML file and the process
//! environment. Environment variables win. Every missing or malformed
//! field is collected before anything is reported, so a broken deployment
//! shows all of its problems at once.
//!
//! ```toml
//! [check]
//! name = "homepage"
//! uri = "https://example.com/"
//! is_paused = false
//! num_retries = 2
//! response_time_sla = 500   # milliseconds
//! use_ssl = true
//!
//! [kafka]
//! bootstrap_servers = "kafka:9092"
//! security_protocol = "SASL_PLAINTEXT"
//! sasl_mechanism = "PLAIN"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ConfigResult, FieldError};
use crate::types::{
    CheckConfig, KafkaConfig, DEFAULT_CHECK_INTERVAL_SECONDS, DEFAULT_TOPIC, DEFAULT_UPTIME_SLA,
    MAX_NUM_RETRIES,
};

/// File representation. Every field is optional so the environment can
/// fill the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub check: RawCheck,
    #[serde(default)]
    pub kafka: RawKafka,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCheck {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub is_paused: Option<bool>,
    pub num_retries: Option<i64>,
    pub response_time_sla: Option<i64>,
    pub use_ssl: Option<bool>,
    pub check_interval_in_seconds: Option<String>,
    pub uptime_sla: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawKafka {
    pub bootstrap_servers: Option<String>,
    pub topic: Option<String>,
    pub security_protocol: Option<String>,
    pub sasl_mechanism: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
}

impl RawSettings {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let raw = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "config file loaded");
        Ok(raw)
    }
}

/// Fully validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub check: CheckConfig,
    /// `None` only when the caller did not require Kafka and none was given.
    pub kafka: Option<KafkaConfig>,
}

impl Settings {
    /// Load from an optional file plus the process environment.
    pub fn load(path: Option<&Path>, require_kafka: bool) -> ConfigResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok(), require_kafka)
    }

    /// Like [`Settings::load`], reading variables through `env`.
    pub fn load_with<F>(path: Option<&Path>, env: F, require_kafka: bool) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => RawSettings::from_file(path)?,
            None => RawSettings::default(),
        };
        Self::resolve(&file, env, require_kafka)
    }

    /// Merge `file` with values from `env` and validate the result.
    pub fn resolve<F>(file: &RawSettings, env: F, require_kafka: bool) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layers = Layers {
            env,
            errors: Vec::new(),
        };
        let c = &file.check;
        let k = &file.kafka;

        let name = layers.non_empty("NAME", c.name.clone());
        let uri = layers
            .non_empty("URI", c.uri.clone())
            .and_then(|uri| layers.check("URI", uri, validate_uri));
        let is_paused = layers.parsed("IS_PAUSED", c.is_paused, parse_bool);
        let num_retries = layers
            .parsed("NUM_RETRIES", c.num_retries, parse_int)
            .and_then(|n| layers.convert("NUM_RETRIES", n, retry_count));
        let sla_ms = layers
            .parsed("RESPONSE_TIME_SLA", c.response_time_sla, parse_int)
            .and_then(|n| layers.convert("RESPONSE_TIME_SLA", n, non_negative_u64));
        let use_ssl = layers.parsed("USE_SSL", c.use_ssl, parse_bool);
        let check_interval = layers
            .optional("CHECK_INTERVAL_IN_SECONDS", c.check_interval_in_seconds.clone())
            .unwrap_or_else(|| DEFAULT_CHECK_INTERVAL_SECONDS.to_string());
        let uptime_sla = layers
            .optional("UPTIME_SLA", c.uptime_sla.clone())
            .unwrap_or_else(|| DEFAULT_UPTIME_SLA.to_string());

        let bootstrap = if require_kafka {
            layers.non_empty("KAFKA_BOOTSTRAP_SERVERS", k.bootstrap_servers.clone())
        } else {
            layers.optional("KAFKA_BOOTSTRAP_SERVERS", k.bootstrap_servers.clone())
        };
        let topic = layers
            .optional("KAFKA_TOPIC", k.topic.clone())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let security_protocol =
            layers.optional("KAFKA_SECURITY_PROTOCOL", k.security_protocol.clone());
        let sasl_mechanism = layers.optional("KAFKA_SASL_MECHANISM", k.sasl_mechanism.clone());
        let sasl_username = layers.optional("KAFKA_SASL_USERNAME", k.sasl_username.clone());
        let sasl_password = layers.optional("KAFKA_SASL_PASSWORD", k.sasl_password.clone());
        if sasl_username.is_some() != sasl_password.is_some() {
            let missing = if sasl_username.is_some() {
                "KAFKA_SASL_PASSWORD"
            } else {
                "KAFKA_SASL_USERNAME"
            };
            layers.errors.push(FieldError::Missing(missing));
        }

        // Every `None` above has pushed a field error.
        let (name, uri, is_paused, num_retries, sla_ms, use_ssl) =
            match (name, uri, is_paused, num_retries, sla_ms, use_ssl) {
                (Some(name), Some(uri), Some(is_paused), Some(retries), Some(sla), Some(use_ssl))
                    if layers.errors.is_empty() =>
                {
                    (name, uri, is_paused, retries, sla, use_ssl)
                }
                _ => return Err(ConfigError::Invalid(layers.errors)),
            };

        let check = CheckConfig {
            name,
            uri,
            is_paused,
            num_retries,
            response_time_sla: Duration::from_millis(sla_ms),
            use_ssl,
            check_interval_in_seconds: check_interval,
            uptime_sla,
        };
        let kafka = bootstrap.map(|bootstrap_servers| KafkaConfig {
            bootstrap_servers,
            topic,
            security_protocol,
            sasl_mechanism,
            sasl_username,
            sasl_password,
        });

        Ok(Self { check, kafka })
    }
}

/// Accumulates field errors while reading env-over-file values.
struct Layers<F> {
    env: F,
    errors: Vec<FieldError>,
}

impl<F> Layers<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&mut self, key: &'static str, file: Option<String>) -> Option<String> {
        (self.env)(key).or(file)
    }

    fn non_empty(&mut self, key: &'static str, file: Option<String>) -> Option<String> {
        match self.optional(key, file) {
            None => {
                self.errors.push(FieldError::Missing(key));
                None
            }
            Some(value) if value.trim().is_empty() => {
                self.malformed(key, value, "must not be empty");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn parsed<T>(
        &mut self,
        key: &'static str,
        file: Option<T>,
        parse: fn(&str) -> Result<T, String>,
    ) -> Option<T> {
        match (self.env)(key) {
            Some(raw) => match parse(&raw) {
                Ok(value) => Some(value),
                Err(reason) => {
                    self.malformed(key, raw, reason);
                    None
                }
            },
            None => {
                if file.is_none() {
                    self.errors.push(FieldError::Missing(key));
                }
                file
            }
        }
    }

    fn convert<T, U>(
        &mut self,
        key: &'static str,
        value: T,
        convert: fn(T) -> Result<U, String>,
    ) -> Option<U>
    where
        T: ToString + Copy,
    {
        match convert(value) {
            Ok(converted) => Some(converted),
            Err(reason) => {
                self.malformed(key, value.to_string(), reason);
                None
            }
        }
    }

    fn check(&mut self, key: &'static str, value: String, check: fn(&str) -> Result<(), String>) -> Option<String> {
        match check(&value) {
            Ok(()) => Some(value),
            Err(reason) => {
                self.malformed(key, value, reason);
                None
            }
        }
    }

    fn malformed(&mut self, field: &'static str, value: String, reason: impl Into<String>) {
        self.errors.push(FieldError::Malformed {
            field,
            value,
            reason: reason.into(),
        });
    }
}

/// Boolean spellings accepted by `IS_PAUSED` and `USE_SSL`.
///
/// Surrounding whitespace is ignored, as it is for integers.
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err("expected a boolean".to_string()),
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| "expected an integer".to_string())
}

fn retry_count(n: i64) -> Result<u32, String> {
    let retries =
        u32::try_from(n).map_err(|_| "expected a non-negative integer".to_string())?;
    if retries > MAX_NUM_RETRIES {
        return Err(format!("at most {MAX_NUM_RETRIES} retries are supported"));
    }
    Ok(retries)
}

fn non_negative_u64(n: i64) -> Result<u64, String> {
    u64::try_from(n).map_err(|_| "expected a non-negative integer".to_string())
}

fn validate_uri(uri: &str) -> Result<(), String> {
    let url = Url::parse(uri).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("expected an http:// or https:// URL".to_string());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err("URL has no host".to_string()),
    }
}
