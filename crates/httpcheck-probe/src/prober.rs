//! Bounded retry loop.
//!
//! Runs up to `num_retries + 1` attempts, stopping at the first one that
//! returns 200 within the response-time SLA. Failed attempts are followed
//! by a fixed backoff unless they were the last.

use std::time::Duration;

use tracing::{info, warn};

use httpcheck_core::{CheckConfig, Outcome};

use crate::checker::{timed_get, Attempt, HttpGetter};

/// Timing knobs for the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Upper bound on a single GET.
    pub attempt_timeout: Duration,
    /// Pause between a failed attempt and the next one.
    pub backoff: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(5),
            backoff: Duration::from_secs(5),
        }
    }
}

/// Outcome plus the attempts that produced it.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub outcome: Outcome,
    pub attempts: Vec<Attempt>,
    /// Number of backoff sleeps taken.
    pub backoffs: u32,
}

/// Runs the retry loop against a single target.
pub struct Prober<G> {
    getter: G,
    policy: ProbePolicy,
}

impl<G: HttpGetter> Prober<G> {
    pub fn new(getter: G) -> Self {
        Self::with_policy(getter, ProbePolicy::default())
    }

    pub fn with_policy(getter: G, policy: ProbePolicy) -> Self {
        Self { getter, policy }
    }

    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    pub fn getter(&self) -> &G {
        &self.getter
    }

    /// Probe `config.uri` until success or retries run out.
    ///
    /// Never fails: transport errors and SLA misses are failed attempts.
    pub async fn run(&self, config: &CheckConfig) -> ProbeReport {
        if config.is_paused {
            warn!(name = %config.name, "target is marked paused; pause is not enforced, probing anyway");
        }

        let sla = config.response_time_sla;
        let max_attempts = config.max_attempts();
        let mut attempts = Vec::new();
        let mut backoffs = 0;

        for number in 1..=max_attempts {
            let attempt = timed_get(&self.getter, &config.uri, number, self.policy.attempt_timeout).await;
            let elapsed = attempt.elapsed();

            if attempt.within_sla(sla) {
                info!(attempt = number, ?elapsed, ?sla, "HTTP GET successful within SLA");
                attempts.push(attempt);
                return ProbeReport {
                    outcome: Outcome::up(elapsed, number),
                    attempts,
                    backoffs,
                };
            }

            match &attempt.result {
                Ok(status) => warn!(
                    attempt = number,
                    status = *status,
                    ?elapsed,
                    ?sla,
                    "HTTP GET failed or exceeded response time SLA"
                ),
                Err(e) => warn!(
                    attempt = number,
                    error = %e,
                    ?elapsed,
                    ?sla,
                    "HTTP GET failed or exceeded response time SLA"
                ),
            }
            attempts.push(attempt);

            if number < max_attempts {
                info!(backoff = ?self.policy.backoff, "sleeping before next retry");
                tokio::time::sleep(self.policy.backoff).await;
                backoffs += 1;
            }
        }

        let last_elapsed = attempts.last().map(Attempt::elapsed).unwrap_or_default();
        warn!(attempts = attempts.len(), "retries exhausted");
        ProbeReport {
            outcome: Outcome::down(last_elapsed, attempts.len() as u32),
            attempts,
            backoffs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use httpcheck_core::StatusSentinel;
    use tokio::time::Instant;

    use crate::checker::{GetFuture, ProbeError};

    /// Replays a script of (latency, result); the last entry repeats.
    struct ScriptedGetter {
        script: Mutex<VecDeque<(Duration, Result<u16, ProbeError>)>>,
        calls: AtomicU32,
    }

    impl ScriptedGetter {
        fn new(script: Vec<(u64, Result<u16, ProbeError>)>) -> Self {
            Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(ms, r)| (Duration::from_millis(ms), r))
                        .collect(),
                ),
                calls: AtomicU32::new(0),
            }
        }

        fn always(latency_ms: u64, result: Result<u16, ProbeError>) -> Self {
            Self::new(vec![(latency_ms, result)])
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpGetter for ScriptedGetter {
        fn get<'a>(&'a self, _uri: &'a str) -> GetFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (latency, result) = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                }
            };
            Box::pin(async move {
                tokio::time::sleep(latency).await;
                result
            })
        }
    }

    fn config(num_retries: u32, sla_ms: u64) -> CheckConfig {
        CheckConfig {
            name: "homepage".to_string(),
            uri: "https://example.com/".to_string(),
            is_paused: false,
            num_retries,
            response_time_sla: Duration::from_millis(sla_ms),
            use_ssl: true,
            check_interval_in_seconds: "86400".to_string(),
            uptime_sla: "100".to_string(),
        }
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_stops_immediately() {
        let prober = Prober::new(ScriptedGetter::always(50, Ok(200)));
        let start = Instant::now();

        let report = prober.run(&config(2, 500)).await;

        assert!(report.outcome.succeeded);
        assert_eq!(report.outcome.final_status_code, StatusSentinel::Up);
        assert_eq!(report.outcome.attempts_made, 1);
        assert_eq!(report.backoffs, 0);
        assert_eq!(prober.getter.calls(), 1);
        assert_near(report.outcome.final_elapsed, Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_exhaust_retries_with_one_backoff() {
        let prober = Prober::new(ScriptedGetter::always(60_000, Ok(200)));
        let start = Instant::now();

        let report = prober.run(&config(1, 500)).await;

        assert!(!report.outcome.succeeded);
        assert_eq!(report.outcome.final_status_code, StatusSentinel::Down);
        assert_eq!(report.outcome.attempts_made, 2);
        assert_eq!(report.backoffs, 1);
        assert!(report
            .attempts
            .iter()
            .all(|a| a.result == Err(ProbeError::Timeout)));
        assert_near(report.outcome.final_elapsed, Duration::from_secs(5));
        // Two 5s timeouts plus one 5s backoff.
        assert_near(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_200_is_retried_like_a_failure() {
        let prober = Prober::new(ScriptedGetter::new(vec![(800, Ok(200)), (100, Ok(200))]));

        let report = prober.run(&config(3, 500)).await;

        assert!(report.outcome.succeeded);
        assert_eq!(report.outcome.attempts_made, 2);
        assert_eq!(report.backoffs, 1);
        assert!(!report.attempts[0].within_sla(Duration::from_millis(500)));
        assert_near(report.outcome.final_elapsed, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_404_whatever_the_last_status() {
        let prober = Prober::new(ScriptedGetter::new(vec![
            (10, Ok(500)),
            (10, Err(ProbeError::Connect("connection refused".to_string()))),
            (900, Ok(200)),
        ]));

        let report = prober.run(&config(2, 500)).await;

        assert!(!report.outcome.succeeded);
        assert_eq!(report.outcome.final_status_code, StatusSentinel::Down);
        assert_eq!(report.outcome.attempts_made, 3);
        assert_eq!(report.attempts[2].status(), Some(200));
        assert_near(report.outcome.final_elapsed, Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_one_attempt_and_no_sleep() {
        let prober = Prober::new(ScriptedGetter::always(10, Ok(503)));
        let start = Instant::now();

        let report = prober.run(&config(0, 500)).await;

        assert_eq!(report.outcome.attempts_made, 1);
        assert_eq!(report.backoffs, 0);
        assert!(!report.outcome.succeeded);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_bounded_and_backoffs_follow_attempts() {
        for retries in 0..5 {
            let failing = Prober::new(ScriptedGetter::always(1, Ok(404)));
            let report = failing.run(&config(retries, 500)).await;
            assert_eq!(report.outcome.attempts_made, retries + 1);
            assert_eq!(report.backoffs, report.outcome.attempts_made - 1);
            assert_eq!(report.attempts.len() as u32, report.outcome.attempts_made);

            for succeed_at in 1..=retries + 1 {
                let mut script = vec![(1, Ok(500)); (succeed_at - 1) as usize];
                script.push((1, Ok(200)));
                let prober = Prober::new(ScriptedGetter::new(script));
                let report = prober.run(&config(retries, 500)).await;
                assert!(report.outcome.succeeded);
                assert_eq!(report.outcome.attempts_made, succeed_at);
                assert_eq!(report.backoffs, succeed_at - 1);
                assert_eq!(prober.getter.calls(), succeed_at);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeded_iff_status_200() {
        for script in [
            vec![(1, Ok(200))],
            vec![(1, Ok(301))],
            vec![(1, Err(ProbeError::Timeout))],
            vec![(1, Ok(500)), (1, Ok(200))],
        ] {
            let prober = Prober::new(ScriptedGetter::new(script));
            let outcome = prober.run(&config(1, 500)).await.outcome;
            assert_eq!(
                outcome.succeeded,
                outcome.final_status_code == StatusSentinel::Up
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn paused_target_is_still_probed() {
        let prober = Prober::new(ScriptedGetter::always(5, Ok(200)));
        let mut cfg = config(0, 500);
        cfg.is_paused = true;

        let report = prober.run(&cfg).await;

        assert_eq!(prober.getter.calls(), 1);
        assert!(report.outcome.succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_shortens_backoff() {
        let policy = ProbePolicy {
            attempt_timeout: Duration::from_millis(200),
            backoff: Duration::from_millis(100),
        };
        let prober = Prober::with_policy(ScriptedGetter::always(1_000, Ok(200)), policy);
        let start = Instant::now();

        let report = prober.run(&config(2, 500)).await;

        assert_eq!(report.outcome.attempts_made, 3);
        assert_eq!(prober.policy(), policy);
        // 3 × 200ms timeouts + 2 × 100ms backoff.
        assert_near(start.elapsed(), Duration::from_millis(800));
    }
}
