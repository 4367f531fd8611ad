use std::time::Duration;

/// Tuning for a [`Receiver`](crate::Receiver).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Upper bound on a single wait for data. Also the worst-case delay
    /// between a stop request and the loop noticing it.
    pub poll_interval: Duration,

    /// Slots in the delivery channel. Zero makes every delivery a rendezvous
    /// with the consumer, so a slow consumer holds back the next writer.
    pub channel_capacity: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            channel_capacity: 0,
        }
    }
}

impl ReceiverConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }
}
