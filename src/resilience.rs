//! Retry with exponential backoff for calls to rate-limited Google APIs.

use crate::error::{Result, TablescopeError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::from_secs_f64(base_delay.min(self.max_delay.as_secs_f64()));

        if self.jitter {
            // Up to 25% extra
            let jitter_factor = 1.0 + rand::random::<f64>() * 0.25;
            Duration::from_secs_f64(delay.as_secs_f64() * jitter_factor)
        } else {
            delay
        }
    }
}

/// Retry executor with exponential backoff.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute a function, retrying errors for which [`TablescopeError::is_retryable`] holds.
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_if(TablescopeError::is_retryable, f).await
    }

    /// Execute a function, retrying only errors accepted by `should_retry`.
    ///
    /// Returns the last error once attempts are exhausted.
    pub async fn execute_if<P, F, Fut, T>(&self, should_retry: P, mut f: F) -> Result<T>
    where
        P: Fn(&TablescopeError) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.config.max_attempts {
            attempt += 1;

            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !should_retry(&e) {
                        return Err(e);
                    }

                    if attempt < self.config.max_attempts {
                        let delay = self.config.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt,
                            max_attempts = self.config.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Retrying after failure"
                        );
                        sleep(delay).await;
                    }

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TablescopeError::Internal("Retry exhausted without error".to_string())
        }))
    }
}
