use serde::{Deserialize, Serialize};

///
/// FlushMode
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FlushMode {
    Auto,
    Commit,
    Manual,
}

///
/// CacheMode
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CacheMode {
    Normal,
    Get,
    Put,
    Refresh,
    Ignore,
}

///
/// LockMode
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LockMode {
    None,
    Read,
    Write,
}

///
/// QueryOptions
///
/// Execution hints handed to the executor unchanged. Every hint is
/// optional; an unset hint means "use the executor's default".
/// Assembled by value and immutable once attached to a query.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct QueryOptions {
    max_results: Option<u32>,
    first_result: Option<u32>,
    cacheable: Option<bool>,
    cache_region: Option<String>,
    comment: Option<String>,
    flush_mode: Option<FlushMode>,
    cache_mode: Option<CacheMode>,
    timeout_secs: Option<u32>,
    lock_mode: Option<LockMode>,
}

impl QueryOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_results: None,
            first_result: None,
            cacheable: None,
            cache_region: None,
            comment: None,
            flush_mode: None,
            cache_mode: None,
            timeout_secs: None,
            lock_mode: None,
        }
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn with_max_results(mut self, n: u32) -> Self {
        self.max_results = Some(n);
        self
    }

    #[must_use]
    pub const fn with_first_result(mut self, n: u32) -> Self {
        self.first_result = Some(n);
        self
    }

    #[must_use]
    pub const fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = Some(cacheable);
        self
    }

    #[must_use]
    pub fn with_cache_region(mut self, region: impl Into<String>) -> Self {
        self.cache_region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub const fn with_flush_mode(mut self, mode: FlushMode) -> Self {
        self.flush_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u32) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub const fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = Some(mode);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn max_results(&self) -> Option<u32> {
        self.max_results
    }

    #[must_use]
    pub const fn first_result(&self) -> Option<u32> {
        self.first_result
    }

    #[must_use]
    pub const fn cacheable(&self) -> Option<bool> {
        self.cacheable
    }

    #[must_use]
    pub fn cache_region(&self) -> Option<&str> {
        self.cache_region.as_deref()
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[must_use]
    pub const fn flush_mode(&self) -> Option<FlushMode> {
        self.flush_mode
    }

    #[must_use]
    pub const fn cache_mode(&self) -> Option<CacheMode> {
        self.cache_mode
    }

    #[must_use]
    pub const fn timeout_secs(&self) -> Option<u32> {
        self.timeout_secs
    }

    #[must_use]
    pub const fn lock_mode(&self) -> Option<LockMode> {
        self.lock_mode
    }

    /// True when no hint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::new()
    }
}
