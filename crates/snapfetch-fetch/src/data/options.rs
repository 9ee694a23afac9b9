use std::time::Duration;

/// Statuses treated as transient by the bucket and catalog endpoints.
///
/// 400, 401 and 403 are included because the storage API returns them
/// intermittently under load for a publicly readable bucket.
pub const DEFAULT_STATUS_FORCELIST: [u16; 10] = [500, 502, 503, 504, 522, 524, 408, 400, 401, 403];

/// Configuration for the retrying [`Transport`](crate::Transport).
///
/// # Examples
///
/// ```
/// use snapfetch_fetch::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::default()
///     .total_retries(3)
///     .backoff_factor(Duration::from_millis(10));
/// assert!(options.is_retryable_status(503));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Connect timeout, and the longest wait for any single read once
    /// connected. A slow transfer that keeps delivering bytes is never cut
    /// off; a stalled one is.
    ///
    /// Default: 300s
    pub timeout: Duration,

    /// Maximum retries of any kind for one request.
    ///
    /// Default: 10
    pub total_retries: u32,

    /// Maximum retries caused by connection failures.
    ///
    /// Default: 10
    pub connect_retries: u32,

    /// Maximum retries caused by timeouts or body read failures.
    ///
    /// Default: 10
    pub read_retries: u32,

    /// Base delay for exponential backoff. Retry `n` (0-indexed) waits
    /// `backoff_factor * 2^n`, capped at `max_backoff`.
    ///
    /// Default: 3s
    pub backoff_factor: Duration,

    /// Upper bound for a single backoff delay.
    ///
    /// Default: 120s
    pub max_backoff: Duration,

    /// Response statuses that trigger a retry.
    pub status_forcelist: Vec<u16>,

    /// Skip TLS certificate verification.
    ///
    /// Default: true
    pub accept_invalid_certs: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout:              Duration::from_secs(300),
            total_retries:        10,
            connect_retries:      10,
            read_retries:         10,
            backoff_factor:       Duration::from_secs(3),
            max_backoff:          Duration::from_secs(120),
            status_forcelist:     DEFAULT_STATUS_FORCELIST.to_vec(),
            accept_invalid_certs: true,
        }
    }
}

impl TransportOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn total_retries(mut self, retries: u32) -> Self {
        self.total_retries = retries;
        self
    }

    pub fn connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    pub fn read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    pub fn backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    pub fn status_forcelist(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.status_forcelist = statuses.into_iter().collect();
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool { self.status_forcelist.contains(&status) }
}
