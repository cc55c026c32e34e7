//! Transfer finite-state machine types.
//!
//! ```text
//!  (entry: initial burst) ──▶ RUNNING ──LAR + 1 == segments──▶ DONE
//!                              │  ▲
//!                              └──┘ receive, flush, retry
//! ```

/// Lifecycle of one transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferState {
    /// Requests outstanding; the loop keeps polling.
    #[default]
    Running,
    /// Every segment has been written to the output.
    Done,
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
