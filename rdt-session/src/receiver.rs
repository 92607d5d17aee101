use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rdt_proto::{
    encode_ack, encode_nak, parse, read_metadata_payload, verify_data_crc, Fragment, BATCH_SIZE,
};

use crate::error::ReceiverError;
use crate::socket::{is_timeout, DatagramSocket};
use crate::timing::{INTER_FRAGMENT_TIMEOUT, POST_DELIVERY_IDLE_TIMEOUT};

/// What a completed transfer handed to its driver, per the two METADATA
/// shapes defined in §5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Message(String),
    File { name: String, bytes: Vec<u8> },
}

/// What happened while waiting out the post-delivery idle window (§4.3).
pub enum PostDelivery {
    /// No keep-alive and no new transfer arrived before the idle timeout:
    /// the session is over.
    Idle,
    /// A new METADATA fragment arrived without a fresh handshake; the
    /// session continues straight into another [`Receiver::receive_transfer`]
    /// call, seeded with this fragment.
    ContinuingTransfer(Fragment),
}

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub inter_fragment_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            inter_fragment_timeout: INTER_FRAGMENT_TIMEOUT,
            idle_timeout: POST_DELIVERY_IDLE_TIMEOUT,
        }
    }
}

/// Accepts one handshake and then reassembles whatever transfers follow,
/// batch by batch, until the sender's keep-alives stop and the idle timeout
/// elapses (§4.2–§4.3).
pub struct Receiver {
    socket: Arc<dyn DatagramSocket>,
    config: ReceiverConfig,
}

impl Receiver {
    pub fn new(socket: Arc<dyn DatagramSocket>, config: ReceiverConfig) -> Self {
        Self { socket, config }
    }

    /// Runs one full session: waits for a handshake, receives one transfer,
    /// and returns as soon as it is delivered. Callers that want to honor
    /// the post-delivery keep-alive window should use [`Self::await_handshake`],
    /// [`Self::receive_transfer`], and [`Self::await_post_delivery`] directly.
    pub fn run_once(&self) -> Result<Delivery, ReceiverError> {
        let peer = self.await_handshake()?;
        self.receive_transfer(peer, None)
    }

    /// Blocks indefinitely for an INIT fragment and echoes it back,
    /// returning the peer's address for the rest of the session.
    pub fn await_handshake(&self) -> Result<SocketAddr, ReceiverError> {
        self.socket.set_read_timeout(None)?;
        let mut buf = [0u8; 64];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf)?;
            match parse(&buf[..n]) {
                Ok(Fragment::Init) => {
                    self.socket.send_to(&buf[..n], peer)?;
                    info!("handshake with {peer} complete");
                    return Ok(peer);
                }
                Ok(other) => debug!("ignoring {other:?} while awaiting handshake"),
                Err(err) => debug!("ignoring malformed datagram while awaiting handshake: {err}"),
            }
        }
    }

    /// Receives one metadata-announced transfer from `peer` and returns its
    /// reassembled payload. If `seed` is `Some`, it is treated as an
    /// already-received METADATA fragment (the continuing-transfer path out
    /// of [`Self::await_post_delivery`]); otherwise this call blocks for one.
    pub fn receive_transfer(
        &self,
        peer: SocketAddr,
        seed: Option<Fragment>,
    ) -> Result<Delivery, ReceiverError> {
        let metadata = match seed {
            Some(fragment) => fragment,
            None => self.recv_metadata(peer)?,
        };

        let (total_n, filename) = match metadata {
            Fragment::Data {
                total_n,
                declared_len,
                raw,
                ..
            } => {
                let filename = if declared_len == 0 {
                    None
                } else {
                    Some(
                        String::from_utf8(read_metadata_payload(&raw).to_vec())
                            .map_err(|_| ReceiverError::InvalidFilename)?,
                    )
                };
                (total_n, filename)
            }
            other => {
                warn!("expected a metadata fragment, got {other:?}");
                return Err(ReceiverError::InvalidFilename);
            }
        };

        info!("receiving {total_n} fragment(s) from {peer}");
        let fragments = self.run_batches(peer, total_n)?;

        // A gap aborts concatenation at that point rather than panicking: a
        // duplicated valid datagram can inflate `total_counter` past the
        // number of distinct indices actually recorded (§4.3's
        // reordering/duplication tolerance), so `delivered` may come up
        // short even though the batch loop believes it saw `total_n`.
        let mut bytes = Vec::new();
        for order in 0..total_n {
            match fragments.get(&order) {
                Some(data) => bytes.extend_from_slice(data),
                None => {
                    warn!("gap at fragment {order}, stopping concatenation early");
                    break;
                }
            }
        }

        match filename {
            Some(name) => Ok(Delivery::File { name, bytes }),
            None => Ok(Delivery::Message(String::from_utf8(bytes)?)),
        }
    }

    /// Waits out the post-delivery idle window, honoring keep-alives and
    /// detecting the start of a follow-up transfer.
    pub fn await_post_delivery(&self, peer: SocketAddr) -> Result<PostDelivery, ReceiverError> {
        self.socket.set_read_timeout(Some(self.config.idle_timeout))?;
        let mut buf = [0u8; 64];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) if from == peer => match parse(&buf[..n]) {
                    Ok(Fragment::KeepAlive) => {
                        debug!("keep-alive from {peer}, idle timer reset");
                        continue;
                    }
                    Ok(metadata @ Fragment::Data { .. }) => {
                        info!("{peer} started a new transfer without re-handshaking");
                        return Ok(PostDelivery::ContinuingTransfer(metadata));
                    }
                    Ok(other) => {
                        debug!("ignoring {other:?} during idle window");
                        continue;
                    }
                    Err(err) => {
                        debug!("ignoring malformed datagram during idle window: {err}");
                        continue;
                    }
                },
                Ok(_) => continue,
                Err(err) if is_timeout(&err) => {
                    info!("idle timeout elapsed for {peer}");
                    return Ok(PostDelivery::Idle);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn recv_metadata(&self, peer: SocketAddr) -> Result<Fragment, ReceiverError> {
        self.socket.set_read_timeout(None)?;
        let mut buf = vec![0u8; 512];
        loop {
            let (n, from) = self.socket.recv_from(&mut buf)?;
            if from != peer {
                continue;
            }
            match parse(&buf[..n]) {
                Ok(metadata @ Fragment::Data { .. }) => return Ok(metadata),
                Ok(other) => debug!("ignoring {other:?} while awaiting metadata"),
                Err(err) => debug!("ignoring malformed datagram while awaiting metadata: {err}"),
            }
        }
    }

    /// Receives `total_n` DATA fragments in batches of [`BATCH_SIZE`],
    /// validating each one's CRC, acking clean batches and NAK'ing the rest,
    /// and synthesizing a NAK for indices that never arrive within the
    /// inter-fragment timeout.
    fn run_batches(
        &self,
        peer: SocketAddr,
        total_n: u16,
    ) -> Result<HashMap<u16, Vec<u8>>, ReceiverError> {
        let mut delivered: HashMap<u16, Vec<u8>> = HashMap::new();
        let mut batch: Vec<(u16, Vec<u8>)> = Vec::with_capacity(BATCH_SIZE);
        let mut counter: u16 = 0;
        let mut total_counter: u16 = 0;

        self.socket
            .set_read_timeout(Some(self.config.inter_fragment_timeout))?;
        let mut buf = vec![0u8; rdt_proto::MAX_FRAGMENT_PAYLOAD + rdt_proto::HEADER_LEN + rdt_proto::CRC_LEN];

        while total_counter < total_n {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) if from == peer => match parse(&buf[..n]) {
                    Ok(Fragment::Data { order, raw, .. }) => {
                        counter += 1;
                        total_counter += 1;
                        batch.push((order, raw));

                        if counter as usize == BATCH_SIZE || total_counter == total_n {
                            self.settle_batch(peer, &mut batch, &mut delivered, &mut total_counter)?;
                            counter = 0;
                        }
                    }
                    Ok(other) => debug!("ignoring {other:?} mid-transfer"),
                    Err(err) => debug!("ignoring malformed datagram mid-transfer: {err}"),
                },
                Ok(_) => continue,
                Err(err) if is_timeout(&err) => {
                    let start = total_counter - counter;
                    let remaining = total_n - start;
                    let missing_count = remaining.min(BATCH_SIZE as u16);
                    let failed: Vec<u16> = (start..start + missing_count).collect();
                    warn!("timed out waiting for fragment(s), NAK'ing {failed:?}");
                    self.socket.send_to(&encode_nak(&failed), peer)?;
                    total_counter = start;
                    counter = 0;
                    batch.clear();
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(delivered)
    }

    /// Validates every fragment buffered for the current batch, keeps the
    /// valid ones, and acks or NAKs the batch accordingly.
    fn settle_batch(
        &self,
        peer: SocketAddr,
        batch: &mut Vec<(u16, Vec<u8>)>,
        delivered: &mut HashMap<u16, Vec<u8>>,
        total_counter: &mut u16,
    ) -> Result<(), ReceiverError> {
        let mut failed = Vec::new();
        for (order, raw) in batch.drain(..) {
            let (data, valid) = verify_data_crc(&raw);
            if valid {
                delivered.insert(order, data.to_vec());
            } else {
                *total_counter -= 1;
                failed.push(order);
            }
        }

        if failed.is_empty() {
            self.socket.send_to(&encode_ack(), peer)?;
        } else {
            warn!("CRC failure on fragment(s) {failed:?}, NAK'ing");
            self.socket.send_to(&encode_nak(&failed), peer)?;
        }
        Ok(())
    }
}
