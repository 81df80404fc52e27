use std::time::Duration;

/// Knobs for one ingestion run. All values are overridable per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Window of no activity after which the run is aborted.
    pub activity_timeout: Duration,
    /// Period of the independent idle checker that force-cancels a reader
    /// whose reads never settle.
    pub watchdog_period: Duration,
    /// Whole-run retries after a failed attempt.
    pub max_retries: u32,
    /// Delay before retry attempt `n` is `retry_base_delay * n`.
    pub retry_base_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            activity_timeout: Duration::from_millis(60_000),
            watchdog_period: Duration::from_millis(5_000),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(1_000),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity_timeout(mut self, timeout: Duration) -> Self {
        self.activity_timeout = timeout;
        self
    }

    pub fn with_watchdog_period(mut self, period: Duration) -> Self {
        self.watchdog_period = period;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.activity_timeout, Duration::from_secs(60));
        assert_eq!(config.watchdog_period, Duration::from_secs(5));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_overrides() {
        let config = StreamConfig::new()
            .with_activity_timeout(Duration::from_secs(5))
            .with_max_retries(0);
        assert_eq!(config.activity_timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }
}
