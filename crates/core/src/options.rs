//! Extraction settings shared by all front ends.

use std::time::Duration;

use crate::recognize::RetryPolicy;

pub const DEFAULT_DPI: u32 = 200;
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Resolution pages are rendered at before recognition.
    pub dpi: u32,
    /// Upper bound for each external tool invocation.
    pub tool_timeout: Duration,
    /// Backoff for the text recognition service.
    pub retry: RetryPolicy,
    /// Leave converted legacy files next to the source.
    pub keep_converted: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            retry: RetryPolicy::default(),
            keep_converted: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_keep_converted(mut self, keep: bool) -> Self {
        self.keep_converted = keep;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractOptions::new();
        assert_eq!(options.dpi, 200);
        assert_eq!(options.tool_timeout, Duration::from_secs(120));
        assert_eq!(options.retry.max_attempts, 5);
        assert!(options.keep_converted);
    }

    #[test]
    fn test_builder() {
        let options = ExtractOptions::new()
            .with_dpi(0)
            .with_tool_timeout(Duration::from_secs(5))
            .with_keep_converted(false);
        assert_eq!(options.dpi, 1);
        assert_eq!(options.tool_timeout, Duration::from_secs(5));
        assert!(!options.keep_converted);
    }
}
