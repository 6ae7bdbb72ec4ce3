//! httpcheck-probe — the availability probe.
//!
//! A run issues timed GET requests against one target until an attempt
//! answers 200 within the response-time SLA or the retry budget is spent.
//!
//! # Architecture
//!
//! ```text
//! Prober<G: HttpGetter>
//!   ├── timed_get() → Attempt (status or ProbeError, elapsed)
//!   ├── Attempt::within_sla()
//!   ├── fixed backoff between failed attempts
//!   └── ProbeReport { Outcome, attempts, backoffs }
//! ```
//!
//! Transport errors never escape the prober. They count as failed
//! attempts, exactly like a non-200 status or a response slower than
//! the SLA.

pub mod checker;
pub mod prober;

pub use checker::{Attempt, GetFuture, HttpGetter, ProbeError, ReqwestGetter};
pub use prober::{ProbePolicy, ProbeReport, Prober};
