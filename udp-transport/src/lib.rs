//! `udp-transport`: reliable download of a fixed-size file over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  GET <off> <len>   ┌──────────┐
//!  │ Transfer │───────────────────▶│   peer   │
//!  └────┬─────┘                    └─────┬────┘
//!       │   DATA <off> <len>\n<bytes>    │
//!       │◀───────────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │  Receiver (validate) ─▶ Window    │
//!  │  Window (slide, flush, retry)     │
//!  │  SegmentTable (circular slots)    │
//!  └────┬──────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`protocol`]: `GET` / `DATA` wire format
//! - [`segment`]: fixed-capacity circular segment table
//! - [`receiver`]: inbound datagram validation
//! - [`window`]: sliding window: requests, retries, in-order flush
//! - [`transfer`]: the transfer loop driving one download
//! - [`state`]: transfer state machine types
//! - [`socket`]: async UDP socket with bounded-wait receive
//! - [`config`]: tunable parameters
//! - [`error`]: fatal error taxonomy

pub mod config;
pub mod error;
pub mod protocol;
pub mod receiver;
pub mod segment;
pub mod socket;
pub mod state;
pub mod transfer;
pub mod window;

pub use config::TransferConfig;
pub use error::TransferError;
pub use transfer::{Transfer, TransferSummary};
