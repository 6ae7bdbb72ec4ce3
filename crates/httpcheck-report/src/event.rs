//! The published result event.

use serde::{Deserialize, Serialize};

use httpcheck_core::{CheckConfig, Outcome, StatusSentinel};

/// Flat record of one run. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub name: String,
    pub uri: String,
    pub is_paused: bool,
    pub num_retries: u32,
    pub uptime_sla: String,
    /// Milliseconds.
    pub response_time_sla: u64,
    pub use_ssl: bool,
    pub response_status_code: StatusSentinel,
    pub check_interval_in_seconds: String,
    pub http_get_success: bool,
    /// Seconds, rounded to two decimals.
    pub response_time: f64,
}

impl ReportEvent {
    pub fn new(config: &CheckConfig, outcome: &Outcome) -> Self {
        Self {
            name: config.name.clone(),
            uri: config.uri.clone(),
            is_paused: config.is_paused,
            num_retries: config.num_retries,
            uptime_sla: config.uptime_sla.clone(),
            response_time_sla: u64::try_from(config.response_time_sla.as_millis()).unwrap_or(u64::MAX),
            use_ssl: config.use_ssl,
            response_status_code: outcome.final_status_code,
            check_interval_in_seconds: config.check_interval_in_seconds.clone(),
            http_get_success: outcome.succeeded,
            response_time: round_centis(outcome.final_elapsed.as_secs_f64()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> CheckConfig {
        CheckConfig {
            name: "homepage".to_string(),
            uri: "https://example.com/".to_string(),
            is_paused: false,
            num_retries: 2,
            response_time_sla: Duration::from_millis(500),
            use_ssl: true,
            check_interval_in_seconds: "86400".to_string(),
            uptime_sla: "100".to_string(),
        }
    }

    #[test]
    fn fields_serialize_in_wire_order() {
        let outcome = Outcome::up(Duration::from_millis(123), 1);
        let json = String::from_utf8(ReportEvent::new(&config(), &outcome).to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"name":"homepage","uri":"https://example.com/","is_paused":false,"#,
                r#""num_retries":2,"uptime_sla":"100","response_time_sla":500,"use_ssl":true,"#,
                r#""response_status_code":"200","check_interval_in_seconds":"86400","#,
                r#""http_get_success":true,"response_time":0.12}"#
            )
        );
    }

    #[test]
    fn failed_run_reports_404_and_false() {
        let outcome = Outcome::down(Duration::from_secs(5), 3);
        let event = ReportEvent::new(&config(), &outcome);
        assert_eq!(event.response_status_code, StatusSentinel::Down);
        assert!(!event.http_get_success);
        assert_eq!(event.response_time, 5.0);

        let value: serde_json::Value = serde_json::from_slice(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["response_status_code"], "404");
        assert_eq!(value["http_get_success"], false);
    }

    #[test]
    fn parsed_payload_reproduces_inputs() {
        let mut cfg = config();
        cfg.is_paused = true;
        cfg.use_ssl = false;
        cfg.num_retries = 7;
        cfg.response_time_sla = Duration::from_millis(1_250);
        let outcome = Outcome::down(Duration::from_millis(4_567), 8);

        let payload = ReportEvent::new(&cfg, &outcome).to_json().unwrap();
        let parsed = ReportEvent::from_json(&payload).unwrap();

        assert_eq!(parsed.name, cfg.name);
        assert_eq!(parsed.uri, cfg.uri);
        assert_eq!(parsed.is_paused, cfg.is_paused);
        assert_eq!(parsed.num_retries, cfg.num_retries);
        assert_eq!(parsed.uptime_sla, cfg.uptime_sla);
        assert_eq!(
            Duration::from_millis(parsed.response_time_sla),
            cfg.response_time_sla
        );
        assert_eq!(parsed.use_ssl, cfg.use_ssl);
        assert_eq!(parsed.check_interval_in_seconds, cfg.check_interval_in_seconds);
        assert_eq!(parsed.response_status_code, outcome.final_status_code);
        assert_eq!(parsed.http_get_success, outcome.succeeded);
        assert!((parsed.response_time - outcome.final_elapsed.as_secs_f64()).abs() <= 0.005);
    }

    #[test]
    fn response_time_rounds_to_centiseconds() {
        assert_eq!(round_centis(0.004), 0.0);
        assert_eq!(round_centis(0.005), 0.01);
        assert_eq!(round_centis(1.236), 1.24);
        assert_eq!(round_centis(12.0), 12.0);
    }
}
