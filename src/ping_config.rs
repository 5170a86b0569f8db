use std::time::Duration;

/// Settings of a ping session. The CLI always uses the defaults.
#[derive(Clone, Debug)]
pub struct PingConfig {
    /// Pause between a reply (or a failed send) and the next request.
    pub interval: Duration,
    /// Longest a single socket read may block before cancellation is checked
    /// again. An expired read is retried, so waiting for a reply stays unbounded.
    pub poll_interval: Duration,
    /// Socket receive buffer size (`SO_RCVBUF`) in bytes.
    pub recv_buffer_size: usize,
}

impl Default for PingConfig {
    fn default() -> Self {
        PingConfig {
            interval: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
            recv_buffer_size: 1024 * 1024,
        }
    }
}
