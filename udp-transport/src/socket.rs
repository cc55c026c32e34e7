//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that adds the
//! bounded-wait receive the transfer loop polls with.  All protocol logic
//! lives elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

/// Largest datagram the receive buffer must hold (IPv4 maximum packet size).
pub const MAX_DATAGRAM: usize = 65_535;

/// An async, datagram-oriented UDP socket.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send `bytes` as one datagram to `dest`.
    ///
    /// A short send is reported as [`io::ErrorKind::WriteZero`].
    pub async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> io::Result<()> {
        let sent = self.inner.send_to(bytes, dest).await?;
        if sent != bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {sent} of {} bytes", bytes.len()),
            ));
        }
        Ok(())
    }

    /// Receive one datagram into `buf`, waiting no later than `deadline`.
    ///
    /// Returns `Ok(None)` when the deadline passes first.
    pub async fn recv_until(
        &self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        match timeout_at(deadline, self.inner.recv_from(buf)).await {
            Ok(Ok((n, addr))) => Ok(Some((n, addr))),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }
}
