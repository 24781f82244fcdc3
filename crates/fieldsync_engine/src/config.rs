//! Engine configuration.

/// Limits applied to one sync request.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Largest per-kind batch accepted in one push. A larger batch is
    /// recorded as a validation error for that kind and skipped; the rest
    /// of the request still runs.
    pub max_push_batch: usize,
}

impl SyncConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_push_batch: 500,
        }
    }

    /// Sets the maximum per-kind push batch size.
    #[must_use]
    pub fn with_max_push_batch(mut self, size: usize) -> Self {
        self.max_push_batch = size;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SyncConfig::new().with_max_push_batch(50);
        assert_eq!(config.max_push_batch, 50);
    }

    #[test]
    fn default_limit_is_sane() {
        assert!(SyncConfig::default().max_push_batch >= 100);
    }
}
