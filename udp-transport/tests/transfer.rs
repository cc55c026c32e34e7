//! Integration tests for complete downloads.
//!
//! Each test spins up an in-process fake file server on the loopback
//! interface.  The server answers `GET` with `DATA` and can drop, duplicate
//! and reorder its responses using a seeded RNG so failures are reproducible.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use udp_transport::protocol::{decode_request, encode_response, Request};
use udp_transport::state::TransferState;
use udp_transport::{Transfer, TransferConfig, TransferError};

// ---------------------------------------------------------------------------
// Fake peer
// ---------------------------------------------------------------------------

/// Fault model applied to every response.  Probabilities are in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    loss: f64,
    duplicate: f64,
    reorder: f64,
    /// Ignore the first request for every offset.
    drop_first: bool,
}

struct Peer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
    handle: JoinHandle<()>,
}

impl Peer {
    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `data` on an ephemeral loopback port.
async fn spawn_peer(data: Vec<u8>, faults: Faults, seed: u64) -> Peer {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
    let addr = socket.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    let handle = tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buf = vec![0u8; 1024];
        let mut held: Option<(Vec<u8>, SocketAddr)> = None;

        loop {
            let Ok((n, client)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Some(req) = decode_request(&buf[..n]) else {
                continue;
            };
            let first_time = {
                let mut seen = log.lock().unwrap();
                let first = !seen.iter().any(|r: &Request| r.offset == req.offset);
                seen.push(req);
                first
            };
            if faults.drop_first && first_time {
                continue;
            }
            if rng.random_bool(faults.loss) {
                continue;
            }

            let start = (req.offset as usize).min(data.len());
            let end = (start + req.length as usize).min(data.len());
            let response = encode_response(req.offset, &data[start..end]);

            if held.is_none() && rng.random_bool(faults.reorder) {
                held = Some((response, client));
                continue;
            }
            let _ = socket.send_to(&response, client).await;
            if rng.random_bool(faults.duplicate) {
                let _ = socket.send_to(&response, client).await;
            }
            if let Some((late, to)) = held.take() {
                let _ = socket.send_to(&late, to).await;
            }
        }
    });

    Peer {
        addr,
        requests,
        handle,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn file(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 253) as u8).collect()
}

fn fast_config() -> TransferConfig {
    TransferConfig {
        retransmit_timeout: Duration::from_millis(30),
        ..TransferConfig::default()
    }
}

/// Download `size` bytes from `peer` into memory, failing after 20 s.
async fn download(
    peer: SocketAddr,
    size: u64,
    config: TransferConfig,
) -> (Vec<u8>, udp_transport::TransferSummary, Transfer) {
    let mut transfer = Transfer::open(peer, size, config).await.expect("open");
    let mut out = Vec::new();
    let summary = tokio::time::timeout(Duration::from_secs(20), transfer.run(&mut out))
        .await
        .expect("transfer timed out")
        .expect("transfer failed");
    (out, summary, transfer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn downloads_2500_bytes_in_three_segments() {
    let data = file(2500);
    let peer = spawn_peer(data.clone(), Faults::default(), 1).await;

    let (out, summary, transfer) = download(peer.addr, 2500, fast_config()).await;

    assert_eq!(out, data);
    assert_eq!(transfer.state(), TransferState::Done);
    assert_eq!(summary.segments, 3);
    assert_eq!(summary.bytes_written, 2500);

    let requests = peer.requests();
    assert_eq!(
        &requests[..3],
        &[
            Request { offset: 0, length: 1000 },
            Request { offset: 1000, length: 1000 },
            Request { offset: 2000, length: 500 },
        ]
    );
}

#[tokio::test]
async fn survives_loss_duplication_and_reordering() {
    let data = file(50_000);
    let faults = Faults {
        loss: 0.2,
        duplicate: 0.2,
        reorder: 0.3,
        drop_first: false,
    };
    let peer = spawn_peer(data.clone(), faults, 42).await;
    let config = TransferConfig {
        window_size: 8,
        ..fast_config()
    };

    let (out, summary, _) = download(peer.addr, 50_000, config).await;

    assert_eq!(out, data);
    assert!(summary.requests_sent > 50, "lost responses must be re-requested");
}

#[tokio::test]
async fn small_window_recycles_slots_many_times() {
    let data = file(10_007);
    let peer = spawn_peer(data.clone(), Faults::default(), 3).await;
    let config = TransferConfig {
        chunk_size: 100,
        window_size: 4,
        ..fast_config()
    };

    let (out, summary, _) = download(peer.addr, 10_007, config).await;

    assert_eq!(out, data);
    assert_eq!(summary.segments, 101);
    // Final short segment was requested with the remainder only.
    assert!(peer
        .requests()
        .contains(&Request { offset: 10_000, length: 7 }));
}

#[tokio::test]
async fn unanswered_requests_are_retransmitted() {
    let data = file(3000);
    let faults = Faults {
        drop_first: true,
        ..Faults::default()
    };
    let peer = spawn_peer(data.clone(), faults, 4).await;

    let (out, _, _) = download(peer.addr, 3000, fast_config()).await;

    assert_eq!(out, data);
    let requests = peer.requests();
    for offset in [0, 1000, 2000] {
        let sent = requests.iter().filter(|r| r.offset == offset).count();
        assert!(sent >= 2, "offset {offset} requested {sent} time(s)");
    }
}

#[tokio::test]
async fn stray_datagrams_are_ignored() {
    let data = file(20_000);
    let peer = spawn_peer(data.clone(), Faults::default(), 5).await;
    let mut transfer = Transfer::open(peer.addr, 20_000, fast_config())
        .await
        .expect("open");
    let client = SocketAddr::from(([127, 0, 0, 1], transfer.local_addr().port()));

    // A third party floods the client with bogus data for every offset.
    let spammer = tokio::spawn(async move {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for round in 0..20u64 {
            for frame in 0..20u64 {
                let bogus = encode_response(frame * 1000, &[0xEE; 1000]);
                let _ = sock.send_to(&bogus, client).await;
            }
            let _ = sock.send_to(b"garbage", client).await;
            tokio::time::sleep(Duration::from_millis(round % 3)).await;
        }
    });

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(20), transfer.run(&mut out))
        .await
        .expect("transfer timed out")
        .expect("transfer failed");
    spammer.await.unwrap();

    assert_eq!(out, data);
}

#[tokio::test]
async fn empty_file_finishes_without_requests() {
    let peer = spawn_peer(Vec::new(), Faults::default(), 6).await;

    let (out, summary, transfer) = download(peer.addr, 0, fast_config()).await;

    assert!(out.is_empty());
    assert_eq!(summary.requests_sent, 0);
    assert_eq!(transfer.state(), TransferState::Done);
    assert!(peer.requests().is_empty());
}

#[tokio::test]
async fn declared_size_larger_than_peer_data_is_zero_padded() {
    // The peer only has 1500 bytes but the caller declares 2500.
    let data = file(1500);
    let peer = spawn_peer(data.clone(), Faults::default(), 7).await;

    let (out, _, _) = download(peer.addr, 2500, fast_config()).await;

    assert_eq!(out.len(), 2500);
    assert_eq!(&out[..1500], &data[..]);
    assert!(out[1500..].iter().all(|&b| b == 0));
}

#[tokio::test]
async fn oversized_file_is_refused() {
    let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let err = Transfer::open(peer, 10_000_001, TransferConfig::default())
        .await
        .err()
        .expect("size above the limit must be refused");
    assert!(matches!(
        err,
        TransferError::FileTooLarge { size: 10_000_001, max: 10_000_000 }
    ));
}

#[tokio::test]
async fn invalid_config_is_refused() {
    let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let config = TransferConfig {
        chunk_size: 0,
        ..TransferConfig::default()
    };
    let err = Transfer::open(peer, 100, config).await.err().expect("must fail");
    assert!(matches!(err, TransferError::InvalidConfig(_)));
}

#[tokio::test]
async fn chunk_larger_than_a_datagram_is_refused() {
    let peer = spawn_peer(file(70_000), Faults::default(), 8).await;
    let config = TransferConfig {
        chunk_size: 70_000,
        window_size: 1,
        ..fast_config()
    };
    let err = Transfer::open(peer.addr, 70_000, config)
        .await
        .err()
        .expect("chunk that cannot fit one datagram must be refused");
    assert!(matches!(err, TransferError::InvalidConfig(_)));
    assert!(peer.requests().is_empty());
}
