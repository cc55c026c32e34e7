//! Transfer loop: drives one download from initial burst to completion.
//!
//! # Architecture
//!
//! ```text
//!  Transfer::run
//!    ├── Window::send_initial_burst ──▶ GET × capacity ──▶ Socket
//!    └── loop while RUNNING
//!          ├── receive_pending  (bounded poll) ──▶ Receiver::on_datagram
//!          ├── Window::advance_and_flush       ──▶ output
//!          └── Window::retry_due_segments      ──▶ GET × due ──▶ Socket
//! ```
//!
//! Everything runs on one task.  The only waits are the bounded socket poll
//! and output writes, so retransmission timeouts are evaluated every
//! iteration even when the peer is silent.
//!
//! ```ignore
//! let mut transfer = Transfer::open(peer, size, TransferConfig::default()).await?;
//! let mut file = tokio::fs::File::create("out.bin").await?;
//! let summary = transfer.run(&mut file).await?;
//! ```

use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::protocol::Request;
use crate::receiver::Receiver;
use crate::socket::{Socket, MAX_DATAGRAM};
use crate::state::TransferState;
use crate::window::Window;

/// Counters reported when a transfer finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub bytes_written: u64,
    pub segments: u64,
    /// Initial requests plus every retransmission.
    pub requests_sent: u64,
    pub datagrams_accepted: u64,
    pub datagrams_rejected: u64,
}

/// One file download from a single peer.
pub struct Transfer {
    state: TransferState,
    socket: Socket,
    receiver: Receiver,
    window: Window,
    config: TransferConfig,
    recv_buf: Vec<u8>,
    summary: TransferSummary,
    /// Last progress decile logged at info level.
    reported_decile: u64,
}

impl Transfer {
    /// Prepare a transfer of `total_size` bytes from `peer` over `socket`.
    ///
    /// The size is trusted as declared; it is only checked against
    /// `config.max_file_size`.
    pub fn new(
        socket: Socket,
        peer: SocketAddr,
        total_size: u64,
        config: TransferConfig,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        if total_size > config.max_file_size {
            return Err(TransferError::FileTooLarge {
                size: total_size,
                max: config.max_file_size,
            });
        }
        let window = Window::new(total_size, config.chunk_size, config.window_size);
        Ok(Self {
            state: TransferState::Running,
            socket,
            receiver: Receiver::new(peer),
            window,
            config,
            recv_buf: vec![0u8; MAX_DATAGRAM],
            summary: TransferSummary::default(),
            reported_decile: 0,
        })
    }

    /// Bind an ephemeral IPv4 socket and prepare a transfer from `peer`.
    pub async fn open(
        peer: SocketAddr,
        total_size: u64,
        config: TransferConfig,
    ) -> Result<Self, TransferError> {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = Socket::bind(local).await.map_err(TransferError::Socket)?;
        Self::new(socket, peer, total_size, config)
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Run the transfer to completion, writing the file to `output`.
    ///
    /// Returns once every segment has been written and `output` flushed.
    /// Socket and output failures abort immediately; whatever prefix was
    /// already written stays in `output`.
    pub async fn run<W>(&mut self, output: &mut W) -> Result<TransferSummary, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.state == TransferState::Done {
            return Ok(self.summary);
        }
        log::info!(
            "[transfer] requesting {} byte(s) in {} segment(s) from {} (window {})",
            self.window.total_size(),
            self.window.total_segments(),
            self.receiver.peer(),
            self.window.capacity()
        );

        let burst = self.window.send_initial_burst(tok_now());
        self.send_requests(&burst).await?;

        while !self.window.is_complete() {
            self.receive_pending().await?;

            let flushed = self.window.advance_and_flush(output).await?;
            if flushed > 0 {
                log::trace!(
                    "[transfer] flushed {flushed} segment(s), LAR={:?}",
                    self.window.last_acknowledged()
                );
                self.report_progress();
            }

            let due = self
                .window
                .retry_due_segments(tok_now(), self.config.retransmit_timeout);
            if !due.is_empty() {
                log::debug!("[transfer] sending {} due request(s)", due.len());
                self.send_requests(&due).await?;
            }
        }

        output.flush().await.map_err(TransferError::Output)?;
        self.state = TransferState::Done;
        self.summary.bytes_written = self.window.bytes_written();
        self.summary.segments = self.window.total_segments();
        log::info!(
            "[transfer] {}: {} byte(s), {} request(s), {} accepted, {} dropped",
            self.state,
            self.summary.bytes_written,
            self.summary.requests_sent,
            self.summary.datagrams_accepted,
            self.summary.datagrams_rejected
        );
        Ok(self.summary)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Encode and send every request to the peer.
    async fn send_requests(&mut self, requests: &[Request]) -> Result<(), TransferError> {
        for req in requests {
            let bytes = req.encode()?;
            self.socket
                .send_to(&bytes, self.receiver.peer())
                .await
                .map_err(TransferError::Socket)?;
            log::trace!("[transfer] → GET {} {}", req.offset, req.length);
        }
        self.summary.requests_sent += requests.len() as u64;
        Ok(())
    }

    /// Drain every datagram that arrives within one poll interval.
    async fn receive_pending(&mut self) -> Result<(), TransferError> {
        let deadline = tok_now() + self.config.poll_interval;
        while let Some((n, from)) = self
            .socket
            .recv_until(&mut self.recv_buf, deadline)
            .await
            .map_err(TransferError::Socket)?
        {
            match self
                .receiver
                .on_datagram(&mut self.window, from, &self.recv_buf[..n])
            {
                Ok(frame) => {
                    self.summary.datagrams_accepted += 1;
                    log::trace!("[transfer] ← DATA frame={frame} accepted");
                }
                Err(reason) => {
                    self.summary.datagrams_rejected += 1;
                    log::debug!("[transfer] ← dropped: {reason}");
                }
            }
        }
        Ok(())
    }

    /// Log progress each time another tenth of the file is written.
    ///
    /// Returns whether a line was logged.
    fn report_progress(&mut self) -> bool {
        let total = self.window.total_size();
        let decile = match total {
            0 => 10,
            _ => self.window.bytes_written() * 10 / total,
        };
        if decile <= self.reported_decile {
            return false;
        }
        self.reported_decile = decile;
        log::info!("PROGRESS: {:.2}%", self.window.progress() * 100.0);
        true
    }
}

/// `tokio::time::Instant::now()`: a convenience alias to avoid the long path.
#[inline]
fn tok_now() -> tokio::time::Instant {
    tokio::time::Instant::now()
}
