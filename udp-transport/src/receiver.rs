//! Receive-side validation of inbound `DATA` datagrams.
//!
//! [`Receiver`] decides whether one datagram may be stored in the window:
//!
//! - It must come from the known peer (address and port).
//! - It must decode as a `DATA` response.
//! - Its slot must currently represent exactly the frame the offset names,
//!   must not be acknowledged yet, and the frame must lie inside the window
//!   `[LAR + 1, LAR + capacity]` and before the end of the file.
//!
//! Anything else is a [`Rejection`]: the datagram is dropped and no state
//! changes.  Rejections never end the transfer.

use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::decode_response;
use crate::window::Window;

/// Why an inbound datagram was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Source address or port differs from the peer's.
    #[error("datagram from unexpected sender {0}")]
    UnknownSender(SocketAddr),
    /// Not a well-formed `DATA` response.
    #[error("malformed DATA datagram")]
    Malformed,
    /// The frame's data is already stored.
    #[error("frame {frame} already acknowledged")]
    Duplicate { frame: u64 },
    /// The slot for this offset currently holds a different cycle's frame.
    #[error("offset {offset} does not match slot frame {slot_frame}")]
    StaleSlot { offset: u64, slot_frame: u64 },
    /// The frame was already written to the output.
    #[error("offset {offset} already delivered")]
    AlreadyDelivered { offset: u64 },
    /// The frame lies past `LAR + capacity`.
    #[error("offset {offset} beyond the window")]
    BeyondWindow { offset: u64 },
    /// The frame starts at or after the declared file size.
    #[error("offset {offset} past the end of the file")]
    PastEndOfFile { offset: u64 },
    /// The payload cannot fit in one slot.
    #[error("payload of {length} bytes exceeds the chunk size")]
    Oversized { length: u64 },
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Validates inbound datagrams against the window for one peer.
#[derive(Debug, Clone, Copy)]
pub struct Receiver {
    peer: SocketAddr,
}

impl Receiver {
    /// Accept data only from `peer`.
    pub fn new(peer: SocketAddr) -> Self {
        Self { peer }
    }

    /// The only address data is accepted from.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Validate one datagram from `from` and store its payload.
    ///
    /// Returns the accepted frame.  On success the slot's payload holds the
    /// received bytes (zero-filled past `length`) and the slot is
    /// acknowledged; on rejection nothing changes.
    pub fn on_datagram(
        &self,
        window: &mut Window,
        from: SocketAddr,
        datagram: &[u8],
    ) -> Result<u64, Rejection> {
        if from != self.peer {
            return Err(Rejection::UnknownSender(from));
        }
        let resp = decode_response(datagram).ok_or(Rejection::Malformed)?;

        let chunk = window.chunk_size() as u64;
        let offset = resp.offset;
        let frame = offset / chunk;
        let slot = window.table().slot_of(frame);
        let seg = window.table().get(slot);

        if seg.acknowledged {
            return Err(Rejection::Duplicate { frame: seg.frame });
        }
        if seg.frame.checked_mul(chunk) != Some(offset) {
            return Err(Rejection::StaleSlot {
                offset,
                slot_frame: seg.frame,
            });
        }
        if frame < window.next_frame() {
            return Err(Rejection::AlreadyDelivered { offset });
        }
        // Window edge is LAR + capacity = next_frame + capacity - 1.
        if frame >= window.next_frame() + window.capacity() as u64 {
            return Err(Rejection::BeyondWindow { offset });
        }
        if frame >= window.total_segments() {
            return Err(Rejection::PastEndOfFile { offset });
        }
        if resp.length > chunk {
            return Err(Rejection::Oversized {
                length: resp.length,
            });
        }

        let table = window.table_mut();
        let seg = table.get_mut(slot);
        let len = resp.payload.len();
        seg.payload[..len].copy_from_slice(resp.payload);
        seg.payload[len..].fill(0);
        table.mark_acked(slot);
        Ok(frame)
    }
}
