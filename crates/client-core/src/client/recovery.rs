//! Retry and timeout helpers for coordinator operations
//!
//! Protocol client construction talks to a relay and can fail transiently;
//! [`retry_with_backoff`] retries it according to a [`RetryConfig`]. Session
//! requests can be bounded with [`with_timeout`].

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::{ClientError, ClientResult};

/// Configuration for retry behavior
///
/// # Examples
///
/// ```rust
/// # use ledgerlink_client_core::client::recovery::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::default();
/// assert_eq!(config.max_attempts, 3);
/// assert_eq!(config.initial_delay, Duration::from_millis(100));
///
/// // Single attempt, the coordinator's default for client construction
/// assert_eq!(RetryConfig::none().max_attempts, 1);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt with no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Quick retries for relay round-trips
    ///
    /// 5 attempts, 50ms initial delay, 5s cap, 1.5x backoff, jitter.
    pub fn quick() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 1.5,
            use_jitter: true,
        }
    }
}

/// Retry an operation with exponential backoff
///
/// Errors for which [`ClientError::is_recoverable`] is false are returned
/// immediately. The delay starts at `initial_delay`, grows by
/// `backoff_multiplier` after each failure, is capped at `max_delay` and may
/// carry ±10% jitter.
///
/// ```rust
/// # use ledgerlink_client_core::client::recovery::{retry_with_backoff, RetryConfig};
/// # use ledgerlink_client_core::ClientError;
/// # use std::sync::atomic::{AtomicU32, Ordering};
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() {
/// let attempts = AtomicU32::new(0);
/// let config = RetryConfig { initial_delay: Duration::from_millis(1), ..RetryConfig::quick() };
///
/// let result = retry_with_backoff("relay_connect", config, || async {
///     if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
///         Err(ClientError::InitializationFailed { reason: "relay busy".into() })
///     } else {
///         Ok("ready")
///     }
/// }).await;
///
/// assert_eq!(result.unwrap(), "ready");
/// assert_eq!(attempts.load(Ordering::SeqCst), 3);
/// # }
/// ```
pub async fn retry_with_backoff<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;
        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = config.max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retries"
                    );
                }
                return Ok(result);
            }
            Err(e) if e.is_recoverable() && attempt < config.max_attempts => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    category = e.category(),
                    next_delay_ms = delay.as_millis() as u64,
                    "Recoverable error, will retry"
                );

                let actual_delay = if config.use_jitter {
                    let jitter = (rand::random::<f64>() - 0.5) * 0.2;
                    let millis = delay.as_millis() as f64;
                    Duration::from_millis((millis * (1.0 + jitter)) as u64)
                } else {
                    delay
                };

                sleep(actual_delay).await;

                let next_delay_ms = (delay.as_millis() as f64 * config.backoff_multiplier) as u64;
                delay = Duration::from_millis(next_delay_ms).min(config.max_delay);
            }
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %e,
                        "Operation failed after all retry attempts"
                    );
                } else {
                    error!(
                        operation = operation_name,
                        error = %e,
                        category = e.category(),
                        "Non-recoverable error, not retrying"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Bound an operation by `timeout`
///
/// Returns [`ClientError::OperationTimeout`] when the deadline passes and the
/// operation's own result otherwise.
///
/// ```rust
/// # use ledgerlink_client_core::client::recovery::with_timeout;
/// # use ledgerlink_client_core::{ClientError, ClientResult};
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() {
/// let result: ClientResult<()> = with_timeout("sign", Duration::from_millis(10), async {
///     tokio::time::sleep(Duration::from_secs(1)).await;
///     Ok(())
/// }).await;
///
/// assert!(matches!(result, Err(ClientError::OperationTimeout { duration_ms: 10 })));
/// # }
/// ```
pub async fn with_timeout<T, F>(
    operation_name: &str,
    timeout: Duration,
    future: F,
) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            error!(
                operation = operation_name,
                timeout_ms = timeout.as_millis() as u64,
                "Operation timed out"
            );
            Err(ClientError::OperationTimeout {
                duration_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            use_jitter: false,
        }
    }

    #[tokio::test]
    async fn test_retry_with_backoff_success() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff("test_operation", fast(5), || async {
            let current = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if current < 3 {
                Err(ClientError::InitializationFailed {
                    reason: "temporary failure".to_string(),
                })
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_recoverable() {
        let attempts = AtomicU32::new(0);

        let result: ClientResult<i32> = retry_with_backoff("test_operation", fast(5), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::RequestRejected {
                reason: "declined".to_string(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);

        let result: ClientResult<i32> = retry_with_backoff("test_operation", fast(2), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::InitializationFailed {
                reason: "down".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(ClientError::InitializationFailed { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_timeout_preserves_inner_error() {
        let result: ClientResult<()> = with_timeout("op", Duration::from_secs(1), async {
            Err(ClientError::RequestRejected {
                reason: "no".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(ClientError::RequestRejected { .. })));
    }
}
