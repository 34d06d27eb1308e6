//! Engine and runtime configuration.

use std::num::NonZeroUsize;

/// Tunables shared by the [`Engine`](crate::engine::Engine) and the
/// [`Runtime`](crate::pipeline::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on parked alternate instances per node part.
    /// `None` keeps every distinct template seen at a site.
    pub alternate_cache_limit: Option<NonZeroUsize>,
    /// Checkpoints `Runtime::flush` may run before giving up.
    pub max_flush_ticks: usize,
    /// Prepended to every persisted storage key.
    pub storage_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alternate_cache_limit: None,
            max_flush_ticks: 64,
            storage_prefix: String::new(),
        }
    }
}

impl Config {
    pub fn with_alternate_cache_limit(mut self, limit: NonZeroUsize) -> Self {
        self.alternate_cache_limit = Some(limit);
        self
    }

    pub fn with_max_flush_ticks(mut self, ticks: usize) -> Self {
        self.max_flush_ticks = ticks;
        self
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }
}
