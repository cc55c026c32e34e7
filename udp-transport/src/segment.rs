//! Fixed-capacity circular table of segment records.
//!
//! Each physical slot represents one logical frame at a time.  Frame `f`
//! lives in slot `f mod capacity`; when a frame is flushed its slot is reused
//! for frame `f + capacity`.  A slot's frame therefore only ever grows, and
//! always by exactly `capacity`.
//!
//! This module only stores state; window policy lives in [`crate::window`].

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One chunk of the file as tracked by its slot.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Logical sequence number (`offset / chunk_size`).
    pub frame: u64,
    /// Data arrived and passed validation.
    pub acknowledged: bool,
    /// Time of the most recent request for `frame`; `None` until first sent.
    pub last_send_time: Option<Instant>,
    /// Received bytes, `chunk_size` long.
    pub payload: Vec<u8>,
}

impl Segment {
    fn new(frame: u64, chunk_size: usize) -> Self {
        Self {
            frame,
            acknowledged: false,
            last_send_time: None,
            payload: vec![0u8; chunk_size],
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentTable
// ---------------------------------------------------------------------------

/// Ring of `capacity` segment slots shared by every cycle of the window.
#[derive(Debug)]
pub struct SegmentTable {
    slots: Vec<Segment>,
}

impl SegmentTable {
    /// Allocate `capacity` slots with frame = slot index.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        assert!(capacity >= 1, "segment table needs at least one slot");
        let slots = (0..capacity)
            .map(|i| Segment::new(i as u64, chunk_size))
            .collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot index that holds `frame`.
    pub fn slot_of(&self, frame: u64) -> usize {
        (frame % self.slots.len() as u64) as usize
    }

    /// Segment stored in `slot`.
    pub fn get(&self, slot: usize) -> &Segment {
        &self.slots[slot]
    }

    /// Mutable segment stored in `slot`.
    pub fn get_mut(&mut self, slot: usize) -> &mut Segment {
        &mut self.slots[slot]
    }

    /// Assign `frame` to `slot` and mark it unacknowledged and unsent.
    pub fn set_frame(&mut self, slot: usize, frame: u64) {
        let seg = &mut self.slots[slot];
        seg.frame = frame;
        seg.acknowledged = false;
        seg.last_send_time = None;
    }

    /// Record that the data for `slot`'s current frame arrived.
    pub fn mark_acked(&mut self, slot: usize) {
        self.slots[slot].acknowledged = true;
    }

    /// Recycle `slot` for the next cycle's frame.
    pub fn reset_for_reuse(&mut self, slot: usize) {
        let capacity = self.slots.len() as u64;
        let seg = &mut self.slots[slot];
        seg.acknowledged = false;
        seg.last_send_time = None;
        seg.frame += capacity;
    }

    /// All slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.slots.iter()
    }
}
