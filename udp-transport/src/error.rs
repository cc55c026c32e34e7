//! Fatal error taxonomy.
//!
//! Everything in [`TransferError`] ends the session.  Recoverable conditions
//! (malformed, stray, duplicate or out-of-window datagrams) are modelled by
//! [`crate::receiver::Rejection`] instead and never reach the transfer loop.

use std::io;

use thiserror::Error;

/// Errors that abort a transfer.
#[derive(Error, Debug)]
pub enum TransferError {
    /// A formatted `GET` request does not fit the request buffer.
    #[error("request GET {offset} {length} exceeds {max} bytes")]
    RequestTooLong { offset: u64, length: u64, max: usize },

    /// Sending to or receiving from the UDP socket failed.
    #[error("socket I/O error: {0}")]
    Socket(#[source] io::Error),

    /// Writing received data to the output failed.
    #[error("output write error: {0}")]
    Output(#[source] io::Error),

    /// The declared file size is above the configured limit.
    #[error("file size {size} exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    /// A [`crate::TransferConfig`] parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
