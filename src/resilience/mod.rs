//! # Resilience
//!
//! Bounded retries for calls to the weather provider and the insight
//! generator. Only failures classified as transient (timeouts, dropped
//! connections, malformed generator output) are retried; everything else
//! fails on the first attempt.
//!
//! ```rust
//! use std::time::Duration;
//! use weather_insights::resilience::{Decision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(200), Duration::from_secs(2));
//! assert_eq!(
//!     policy.decide(true, 0),
//!     Decision::Retry { delay: Duration::from_millis(200) }
//! );
//! assert_eq!(policy.decide(true, 2), Decision::Fail);
//! assert_eq!(policy.decide(false, 0), Decision::Fail);
//! ```

mod retry;

pub use retry::{
    Decision, RetryFailure, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS,
    DEFAULT_MIN_DELAY_MS,
};
