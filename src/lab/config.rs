//! Configuration for the lab host.
//!
//! The lab configuration controls how a [`Suite`](super::Suite) executes:
//! - How many concurrent tests are joined at once
//! - Whether to stop scheduling tests after the first failure

/// Configuration for the lab host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Maximum number of concurrent tests polled together.
    ///
    /// `0` is treated as `1`.
    pub max_concurrency: usize,
    /// Skip every remaining test once one has failed.
    ///
    /// After-hooks of groups that already started still run.
    pub bail: bool,
}

impl LabConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_concurrency: 5,
            bail: false,
        }
    }

    /// Sets the concurrent batch size.
    #[must_use]
    pub const fn max_concurrency(mut self, value: usize) -> Self {
        self.max_concurrency = value;
        self
    }

    /// Sets whether to stop after the first failed test.
    #[must_use]
    pub const fn bail(mut self, value: bool) -> Self {
        self.bail = value;
        self
    }

    /// Returns the effective batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        if self.max_concurrency == 0 {
            1
        } else {
            self.max_concurrency
        }
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::new()
    }
}
