use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delays_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delays_ms: vec![5_000, 15_000, 60_000],
        }
    }
}

impl RetryConfig {
    /// Backoff delay after `attempts` delivery attempts have been made.
    /// The sequence is fixed; attempts beyond its length reuse the last entry.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let index = attempts.saturating_sub(1) as usize;
        let ms = self
            .delays_ms
            .get(index)
            .or(self.delays_ms.last())
            .copied()
            .unwrap_or(0);

        Duration::from_millis(ms)
    }
}
