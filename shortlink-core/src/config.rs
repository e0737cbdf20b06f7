use std::time::Duration;

/// Default lifetime of a record (12 hours)
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);

/// Upper bound on a record lifetime (~100 years); longer values are capped to
/// prevent overflow when computing expiry times
pub const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Default bound on how long `shutdown` waits for pending expiry checks
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Registry`](crate::Registry)
///
/// # Example
///
/// ```rust
/// use shortlink_core::RegistryConfig;
/// use std::time::Duration;
///
/// let config = RegistryConfig::default()
///     .with_shutdown_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Time between creating a record and its expiry (default: 12 hours)
    pub lifetime: Duration,
    /// Upper bound on draining pending expiry checks at shutdown (default: 5 seconds)
    pub shutdown_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl RegistryConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record lifetime
    ///
    /// Every record created by the registry expires this long after creation,
    /// and its one-shot expiry check fires after the same delay. Values above
    /// [`MAX_LIFETIME`] are capped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shortlink_core::RegistryConfig;
    /// use std::time::Duration;
    ///
    /// let config = RegistryConfig::default()
    ///     .with_lifetime(Duration::from_secs(60 * 60));
    /// ```
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime.min(MAX_LIFETIME);
        self
    }

    /// Sets how long `shutdown` waits for outstanding expiry checks before
    /// aborting them
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
