//! Sliding-window controller.
//!
//! [`Window`] owns the [`SegmentTable`] and the acknowledged frontier.  It
//! decides which byte ranges must be requested and writes completed segments
//! to the output strictly in offset order.
//!
//! # Window layout
//!
//! ```text
//!        LAR  next_frame               next_frame + capacity - 1
//!         │     │                                   │
//!  ───────┼─────┼───────────────────────────────────┼──────▶ frames
//!  flushed│     │<──── requested / acknowledged ───▶│
//! ```
//!
//! `LAR` ("last acknowledged run") is the highest frame such that every frame
//! up to it has been flushed.  It starts one before frame 0, so it is stored
//! as `next_frame = LAR + 1`.
//!
//! Socket I/O is the caller's responsibility: methods that need requests sent
//! return them as [`Request`] values.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::error::TransferError;
use crate::protocol::Request;
use crate::segment::SegmentTable;

/// Sliding window over the file's segments.
///
/// Tracks the first unflushed frame and the byte count written so far; the
/// window spans frames `[next_frame, next_frame + capacity)`.
#[derive(Debug)]
pub struct Window {
    table: SegmentTable,
    chunk_size: usize,
    total_size: u64,
    total_segments: u64,
    /// `LAR + 1`: the first frame not yet flushed.
    next_frame: u64,
    bytes_written: u64,
}

impl Window {
    /// Create the window for a file of `total_size` bytes.
    ///
    /// Capacity is `min(window_size, total_segments)`, with at least one slot
    /// so that an empty file still has a valid table.
    pub fn new(total_size: u64, chunk_size: usize, window_size: usize) -> Self {
        assert!(chunk_size >= 1, "chunk_size must be at least 1");
        assert!(window_size >= 1, "window_size must be at least 1");
        let total_segments = total_size.div_ceil(chunk_size as u64);
        let capacity = (window_size as u64).min(total_segments).max(1) as usize;
        Self {
            table: SegmentTable::new(capacity, chunk_size),
            chunk_size,
            total_size,
            total_segments,
            next_frame: 0,
            bytes_written: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Number of slots, i.e. frames that may be in flight at once.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Bytes per full segment.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Declared size of the file in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Number of segments in the file (`ceil(total_size / chunk_size)`).
    pub fn total_segments(&self) -> u64 {
        self.total_segments
    }

    /// First frame that has not been flushed yet (`LAR + 1`).
    pub fn next_frame(&self) -> u64 {
        self.next_frame
    }

    /// Highest contiguously flushed frame, `None` before the first flush.
    pub fn last_acknowledged(&self) -> Option<u64> {
        self.next_frame.checked_sub(1)
    }

    /// Bytes written to the output so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Read access to the slot table.
    pub fn table(&self) -> &SegmentTable {
        &self.table
    }

    /// Mutable slot table, used by the receive validator to store payloads.
    pub fn table_mut(&mut self) -> &mut SegmentTable {
        &mut self.table
    }

    /// All segments delivered: `LAR + 1 == total_segments`.
    pub fn is_complete(&self) -> bool {
        self.next_frame == self.total_segments
    }

    /// Fraction of the file written so far, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_size == 0 {
            return 1.0;
        }
        self.bytes_written as f64 / self.total_size as f64
    }

    /// True length of `frame`: a full chunk, or the remainder for the last one.
    pub fn segment_len(&self, frame: u64) -> usize {
        let start = frame * self.chunk_size as u64;
        let remaining = self.total_size.saturating_sub(start);
        remaining.min(self.chunk_size as u64) as usize
    }

    /// The `GET` range for `frame`.
    pub fn request_for(&self, frame: u64) -> Request {
        Request {
            offset: frame * self.chunk_size as u64,
            length: self.segment_len(frame) as u64,
        }
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Initialise every slot and return one request per slot.
    ///
    /// Each slot is stamped with `now`.  Nothing is returned for an empty file.
    pub fn send_initial_burst(&mut self, now: Instant) -> Vec<Request> {
        if self.total_segments == 0 {
            return Vec::new();
        }
        let capacity = self.capacity();
        let mut requests = Vec::with_capacity(capacity);
        for slot in 0..capacity {
            let frame = slot as u64;
            self.table.set_frame(slot, frame);
            self.table.get_mut(slot).last_send_time = Some(now);
            requests.push(self.request_for(frame));
        }
        requests
    }

    /// Collect requests for every segment whose retransmission is due.
    ///
    /// Slots are visited in window order starting at `LAR + 1`.  A segment is
    /// due when it is unacknowledged, lies before the end of the file, and was
    /// either never requested or requested at least `timeout` ago.  Due
    /// segments are re-stamped with `now`; their frame is unchanged.
    pub fn retry_due_segments(&mut self, now: Instant, timeout: Duration) -> Vec<Request> {
        let capacity = self.capacity() as u64;
        let mut requests = Vec::new();
        for i in 0..capacity {
            let slot = self.table.slot_of(self.next_frame + i);
            let seg = self.table.get(slot);
            if seg.acknowledged || seg.frame >= self.total_segments {
                continue;
            }
            let due = match seg.last_send_time {
                None => true,
                Some(sent) => now.saturating_duration_since(sent) >= timeout,
            };
            if !due {
                continue;
            }
            let frame = seg.frame;
            self.table.get_mut(slot).last_send_time = Some(now);
            requests.push(self.request_for(frame));
        }
        requests
    }

    // -----------------------------------------------------------------------
    // Flushing
    // -----------------------------------------------------------------------

    /// Write every contiguous acknowledged segment starting at `LAR + 1`.
    ///
    /// Each flushed slot is recycled for frame `+ capacity`.  Stops at the
    /// first gap.  Returns the number of segments written.
    pub async fn advance_and_flush<W>(&mut self, output: &mut W) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut flushed = 0u64;
        while self.next_frame < self.total_segments {
            let slot = self.table.slot_of(self.next_frame);
            let seg = self.table.get(slot);
            if !seg.acknowledged {
                break;
            }
            debug_assert_eq!(seg.frame, self.next_frame, "slot holds a foreign frame");

            let len = self.segment_len(self.next_frame);
            output
                .write_all(&seg.payload[..len])
                .await
                .map_err(TransferError::Output)?;

            self.bytes_written += len as u64;
            self.table.reset_for_reuse(slot);
            self.next_frame += 1;
            flushed += 1;
        }
        Ok(flushed)
    }
}
