use std::time::Duration;

use pdr_core::config::WebSearchSettings;

/// Attempts per query (first call included) and the fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 3, delay: Duration::from_millis(250) } }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self { Self { max_attempts: max_attempts.max(1), delay } }

    /// No pause between attempts.
    pub fn immediate(max_attempts: usize) -> Self { Self::new(max_attempts, Duration::ZERO) }

    pub fn from_settings(settings: &WebSearchSettings) -> Self {
        Self::new(settings.max_attempts, Duration::from_millis(settings.retry_delay_ms))
    }

    pub(crate) async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn reads_settings() {
        let settings = WebSearchSettings { max_attempts: 5, retry_delay_ms: 0, ..WebSearchSettings::default() };
        assert_eq!(RetryPolicy::from_settings(&settings), RetryPolicy::immediate(5));
    }
}
