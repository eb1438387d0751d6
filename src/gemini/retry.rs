//! Retry and back-off policy for generation requests.
//!
//! Only the provider's overload and rate-limit statuses are retried. Every other
//! failure means the request itself is wrong and is surfaced immediately.

use std::time::Duration;

/// Default number of attempts made while the model reports overload.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default back-off step; the n-th retry waits n steps.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(10);

/// HTTP status code the provider uses for "model overloaded".
pub const HTTP_STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// HTTP status code the provider uses when the quota is momentarily exhausted.
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Whether a response status means the model is temporarily unavailable:
/// overloaded (503) or rate limited (429).
pub fn is_overloaded(status: reqwest::StatusCode) -> bool {
    matches!(
        status.as_u16(),
        HTTP_STATUS_SERVICE_UNAVAILABLE | HTTP_STATUS_TOO_MANY_REQUESTS
    )
}

/// Delay before the next attempt after `attempt` (1-based) failed.
///
/// Grows linearly: attempt 1 waits one step, attempt 2 waits two, and so on.
pub fn linear_backoff(attempt: u32, step: Duration) -> Duration {
    step.saturating_mul(attempt.max(1))
}
