use std::time::Duration;

use rek_journal::JournalConfig;

/// Bounded retry for operations that failed on lock contention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt number `attempt` (the first retry is attempt 2).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(2).min(16);
        self.base_delay.saturating_mul(1 << doublings)
    }
}

/// Configuration for [`crate::LedgerEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Longest wait for a single row or document lock.
    pub lock_timeout: Duration,
    pub retry: RetryConfig,
    pub journal: JournalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}
