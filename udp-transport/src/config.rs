//! Transfer parameters.
//!
//! [`TransferConfig`] gathers every tunable the engine reads.  The defaults
//! match the wire contract expected by the peer: 1000-byte chunks, a window
//! of 1000 segments, and a fixed 500 ms retransmission interval.

use std::time::Duration;

use crate::error::TransferError;

/// Default size of one requested chunk in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of segments kept in flight.
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

/// Default retransmission interval for an unacknowledged segment.
pub const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default bounded wait of one receive poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Largest file size accepted from the caller.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_000_000;

/// Largest UDP payload an IPv4 datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Longest `DATA` header: `DATA ` + 20-digit offset + ` ` + 5-digit length + `\n`.
const MAX_DATA_HEADER_LEN: usize = 5 + 20 + 1 + 5 + 1;

/// Largest chunk whose `DATA` response still fits in one datagram.
pub const MAX_CHUNK_SIZE: usize = MAX_UDP_PAYLOAD - MAX_DATA_HEADER_LEN;

/// Tunable parameters of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Bytes requested per `GET` (the last chunk may be shorter).
    pub chunk_size: usize,
    /// Upper bound on segments in flight.  Shrunk to the segment count for
    /// small files.
    pub window_size: usize,
    /// Time after which an unacknowledged request is sent again.
    pub retransmit_timeout: Duration,
    /// How long one receive poll waits for datagrams before the loop moves on.
    pub poll_interval: Duration,
    /// Declared sizes above this are refused.
    pub max_file_size: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            retransmit_timeout: DEFAULT_RETRANSMIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl TransferConfig {
    /// Reject parameter combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidConfig("chunk_size must be at least 1"));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(TransferError::InvalidConfig(
                "chunk_size does not fit in a single DATA datagram",
            ));
        }
        if self.window_size == 0 {
            return Err(TransferError::InvalidConfig("window_size must be at least 1"));
        }
        if self.retransmit_timeout.is_zero() {
            return Err(TransferError::InvalidConfig("retransmit_timeout must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(TransferError::InvalidConfig("poll_interval must be non-zero"));
        }
        Ok(())
    }
}
