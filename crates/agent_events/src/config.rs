/// Bounds applied while draining a child process's output.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LineLimits {
    /// Lines longer than this are discarded whole; reading continues with the next line.
    pub max_line_bytes: usize,
    /// Capacity of the queue between the two pipe readers and the decode loop.
    pub channel_capacity: usize,
    /// Cap on undecodable stderr text retained for failure reports.
    pub max_diagnostic_bytes: usize,
}

impl Default for LineLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
            channel_capacity: 64,
            max_diagnostic_bytes: 64 * 1024,
        }
    }
}
