//! Single-attempt probe logic.
//!
//! The HTTP transport sits behind [`HttpGetter`] so the retry loop can be
//! driven by a scripted getter in tests. [`ReqwestGetter`] is the real one.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Boxed future returned by [`HttpGetter::get`].
pub type GetFuture<'a> = Pin<Box<dyn Future<Output = Result<u16, ProbeError>> + Send + 'a>>;

/// Why an attempt produced no HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProbeError::Timeout
        } else if e.is_connect() {
            ProbeError::Connect(e.to_string())
        } else {
            ProbeError::Request(e.to_string())
        }
    }
}

/// Performs one GET and returns the status code. Injected for testability.
pub trait HttpGetter: Send + Sync {
    fn get<'a>(&'a self, uri: &'a str) -> GetFuture<'a>;
}

/// [`HttpGetter`] backed by `reqwest`.
///
/// Idle connections are never pooled, so every GET opens its own TCP (and
/// TLS) connection and its timing includes the handshake.
#[derive(Debug, Clone)]
pub struct ReqwestGetter {
    client: reqwest::Client,
}

impl ReqwestGetter {
    /// Build a client with the given per-request timeout.
    ///
    /// With `verify_tls = false` the client accepts any certificate,
    /// including self-signed and forged ones.
    pub fn new(verify_tls: bool, timeout: Duration) -> Result<Self, ProbeError> {
        if !verify_tls {
            warn!("TLS certificate verification is disabled for this check");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(!verify_tls)
            .user_agent(concat!("httpcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpGetter for ReqwestGetter {
    fn get<'a>(&'a self, uri: &'a str) -> GetFuture<'a> {
        Box::pin(async move {
            let resp = self.client.get(uri).send().await.map_err(|e| {
                debug!(error = %e, %uri, "probe request failed");
                ProbeError::from(e)
            })?;
            Ok(resp.status().as_u16())
        })
    }
}

/// One timed GET and its result.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    pub started: Instant,
    pub finished: Instant,
    pub result: Result<u16, ProbeError>,
}

impl Attempt {
    pub fn elapsed(&self) -> Duration {
        self.finished.saturating_duration_since(self.started)
    }

    /// HTTP status, if the request got one.
    pub fn status(&self) -> Option<u16> {
        self.result.as_ref().ok().copied()
    }

    /// No transport error, status 200, and not slower than `sla`.
    pub fn within_sla(&self, sla: Duration) -> bool {
        self.status() == Some(200) && self.elapsed() <= sla
    }
}

/// Issue one GET bounded by `timeout` and time it.
pub async fn timed_get<G>(getter: &G, uri: &str, number: u32, timeout: Duration) -> Attempt
where
    G: HttpGetter + ?Sized,
{
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, getter.get(uri)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%uri, ?timeout, "probe timed out");
            Err(ProbeError::Timeout)
        }
    };
    let finished = Instant::now();

    Attempt {
        number,
        started,
        finished,
        result,
    }
}
