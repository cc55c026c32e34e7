//! Wire-format definitions for requests and responses.
//!
//! The protocol is textual with a binary payload:
//!
//! ```text
//!  client ──▶ peer    GET <offset> <length>\n
//!  peer   ──▶ client  DATA <offset> <length>\n<length raw bytes>
//! ```
//!
//! `offset` and `length` are unsigned decimal integers.  Requests carry no
//! payload.  The payload of a response starts right after the first newline.
//!
//! No I/O happens here: this is pure data transformation.

use crate::error::TransferError;

/// Largest encoded `GET` request accepted by the peer, newline included.
pub const MAX_REQUEST_LEN: usize = 20;

const GET_PREFIX: &[u8] = b"GET ";
const DATA_PREFIX: &[u8] = b"DATA ";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request for the byte range `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub offset: u64,
    pub length: u64,
}

impl Request {
    /// Serialise into `GET <offset> <length>\n`.
    pub fn encode(&self) -> Result<Vec<u8>, TransferError> {
        encode_request(self.offset, self.length)
    }
}

/// Build the datagram `GET <offset> <length>\n`.
///
/// Fails with [`TransferError::RequestTooLong`] when the text would not fit
/// in [`MAX_REQUEST_LEN`] bytes.
pub fn encode_request(offset: u64, length: u64) -> Result<Vec<u8>, TransferError> {
    let text = format!("GET {offset} {length}\n");
    if text.len() > MAX_REQUEST_LEN {
        return Err(TransferError::RequestTooLong {
            offset,
            length,
            max: MAX_REQUEST_LEN,
        });
    }
    Ok(text.into_bytes())
}

/// Parse a `GET` request datagram.  Used by peers and test doubles.
pub fn decode_request(buf: &[u8]) -> Option<Request> {
    let rest = buf.strip_prefix(GET_PREFIX)?;
    let (offset, length, tail) = parse_header_numbers(rest)?;
    if !tail.is_empty() {
        return None;
    }
    Some(Request { offset, length })
}

// ---------------------------------------------------------------------------
// DataResponse
// ---------------------------------------------------------------------------

/// A decoded `DATA` response borrowing its payload from the datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataResponse<'a> {
    pub offset: u64,
    pub length: u64,
    /// Exactly `length` bytes.
    pub payload: &'a [u8],
}

/// Parse `DATA <offset> <length>\n` followed by `length` payload bytes.
///
/// Returns `None` when the header does not match the grammar exactly (single
/// spaces, ASCII digits only) or the datagram carries fewer than `length`
/// payload bytes.  Bytes past `length` are ignored.
pub fn decode_response(buf: &[u8]) -> Option<DataResponse<'_>> {
    let rest = buf.strip_prefix(DATA_PREFIX)?;
    let (offset, length, tail) = parse_header_numbers(rest)?;
    let len = usize::try_from(length).ok()?;
    let payload = tail.get(..len)?;
    Some(DataResponse {
        offset,
        length,
        payload,
    })
}

/// Build a `DATA` datagram for `payload` at `offset`.
pub fn encode_response(offset: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = format!("DATA {offset} {}\n", payload.len()).into_bytes();
    buf.extend_from_slice(payload);
    buf
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse `<u> <u>\n` and return both numbers plus everything after the newline.
fn parse_header_numbers(buf: &[u8]) -> Option<(u64, u64, &[u8])> {
    let newline = buf.iter().position(|&b| b == b'\n')?;
    let (header, tail) = (&buf[..newline], &buf[newline + 1..]);

    let space = header.iter().position(|&b| b == b' ')?;
    let first = parse_decimal(&header[..space])?;
    let second = parse_decimal(&header[space + 1..])?;
    Some((first, second, tail))
}

/// Strict unsigned decimal: non-empty, digits only, fits in `u64`.
fn parse_decimal(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    digits.iter().try_fold(0u64, |acc, &d| {
        acc.checked_mul(10)?.checked_add(u64::from(d - b'0'))
    })
}
