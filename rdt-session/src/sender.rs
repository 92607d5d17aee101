use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rdt_proto::{
    encode_data, encode_init, encode_metadata_file, encode_metadata_message, parse, Fragment,
    MAX_FRAGMENT_PAYLOAD,
};

use crate::error::SenderError;
use crate::inject::CorruptionConfig;
use crate::keepalive::KeepAliveHandle;
use crate::socket::{is_timeout, DatagramSocket};
use crate::timing::{HANDSHAKE_TIMEOUT, KEEPALIVE_INTERVAL};

/// What a [`Sender`] transfers, mirroring the two METADATA shapes in §5.
#[derive(Debug, Clone)]
pub enum Payload {
    Message(Vec<u8>),
    File { name: String, bytes: Vec<u8> },
}

/// Connection-level tunables for a [`Sender`], stable across every transfer
/// it sends. Defaults match §4/§7; tests shrink the timeouts so recovery
/// scenarios run in milliseconds instead of seconds.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub handshake_timeout: Duration,
    pub keepalive_interval: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: HANDSHAKE_TIMEOUT,
            keepalive_interval: KEEPALIVE_INTERVAL,
        }
    }
}

/// Per-transfer choices the driver supplies fresh each time (§6): the
/// requested fragment size and whether to exercise the fault-injection
/// hooks on this particular transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferOptions {
    /// Requested fragment size in `1..=MAX_FRAGMENT_PAYLOAD`, or `0` to have
    /// the sender pick `min(payload_len, MAX_FRAGMENT_PAYLOAD)` (§4.2).
    pub fragment_size: u16,
    pub corruption: CorruptionConfig,
}

/// Drives one reliable transfer to `dest` and, once it completes, keeps the
/// session alive in the background until the handle is cancelled (§4.1–§4.5).
pub struct Sender {
    socket: Arc<dyn DatagramSocket>,
    dest: SocketAddr,
    config: SenderConfig,
}

impl Sender {
    pub fn new(socket: Arc<dyn DatagramSocket>, dest: SocketAddr, config: SenderConfig) -> Self {
        Self {
            socket,
            dest,
            config,
        }
    }

    /// Runs the handshake, then sends `payload`'s metadata and fragments
    /// as [`Self::continue_transfer`] does. Use this for the first transfer
    /// to a destination.
    pub fn send(&self, payload: Payload, options: TransferOptions) -> Result<KeepAliveHandle, SenderError> {
        self.handshake()?;
        self.continue_transfer(payload, options)
    }

    /// Sends `payload`'s metadata and fragments without a handshake,
    /// batching transmissions and repairing NAK'd indices until the
    /// receiver acks every fragment. On success, spawns the keep-alive
    /// thread and returns its handle.
    ///
    /// Use this for a follow-up transfer to a destination whose connection
    /// is still alive (its keep-alive thread is still running): per §4.3 the
    /// receiver recognizes a bare METADATA fragment arriving mid-keep-alive
    /// as the start of a new reception and does not expect a fresh INIT.
    pub fn continue_transfer(
        &self,
        payload: Payload,
        options: TransferOptions,
    ) -> Result<KeepAliveHandle, SenderError> {
        let bytes: &[u8] = match &payload {
            Payload::Message(bytes) => bytes,
            Payload::File { bytes, .. } => bytes,
        };
        let fragment_size = resolve_fragment_size(options.fragment_size, bytes.len());
        let fragments = fragment_payload(bytes, fragment_size);

        let metadata = match &payload {
            Payload::Message(_) => encode_metadata_message(fragments.len() as u16),
            Payload::File { name, .. } => {
                encode_metadata_file(fragments.len() as u16, name.as_bytes())
            }
        };

        self.socket.send_to(&metadata, self.dest)?;
        info!(
            "sent metadata for {} fragment(s) of size {fragment_size} to {}",
            fragments.len(),
            self.dest
        );

        let wire_fragments: Vec<Vec<u8>> = fragments
            .iter()
            .enumerate()
            .map(|(order, data)| {
                encode_data(fragments.len() as u16, order as u16, fragment_size, data)
            })
            .collect();

        self.transmit_with_retries(wire_fragments, options.corruption)?;

        info!("transfer to {} complete, starting keep-alive", self.dest);
        Ok(KeepAliveHandle::spawn(
            Arc::clone(&self.socket),
            self.dest,
            self.config.keepalive_interval,
        ))
    }

    /// Sends INIT and blocks for its echo, with no retry: per §7 a timed-out
    /// handshake is fatal and left to the caller to restart.
    fn handshake(&self) -> Result<(), SenderError> {
        self.socket
            .set_read_timeout(Some(self.config.handshake_timeout))?;
        self.socket.send_to(&encode_init(), self.dest)?;

        let mut buf = [0u8; 64];
        match self.socket.recv_from(&mut buf) {
            Ok((n, _)) => match parse(&buf[..n]) {
                Ok(Fragment::Init) => {
                    debug!("handshake with {} complete", self.dest);
                    self.socket.set_read_timeout(None)?;
                    Ok(())
                }
                _ => Err(SenderError::UnexpectedFragment),
            },
            Err(err) if is_timeout(&err) => Err(SenderError::HandshakeTimeout),
            Err(err) => Err(err.into()),
        }
    }

    /// Sends all fragments in batches of [`rdt_proto::BATCH_SIZE`], waiting
    /// for each batch's ACK/NAK before advancing, and re-sends any indices a
    /// NAK names until the whole transfer is acked.
    fn transmit_with_retries(
        &self,
        wire_fragments: Vec<Vec<u8>>,
        mut corruption: CorruptionConfig,
    ) -> Result<(), SenderError> {
        let mut pending: VecDeque<usize> = (0..wire_fragments.len()).collect();

        while !pending.is_empty() {
            let mut batch = Vec::with_capacity(rdt_proto::BATCH_SIZE);
            while batch.len() < rdt_proto::BATCH_SIZE {
                match pending.pop_front() {
                    Some(index) => batch.push(index),
                    None => break,
                }
            }

            for (position, &index) in batch.iter().enumerate() {
                if corruption.should_skip() {
                    debug!("corruption injection dropped fragment {index}");
                    continue;
                }
                let mut bytes = wire_fragments[index].clone();
                corruption.maybe_alter(position, &mut bytes);
                self.socket.send_to(&bytes, self.dest)?;
            }

            let mut buf = vec![0u8; MAX_FRAGMENT_PAYLOAD + rdt_proto::HEADER_LEN + rdt_proto::CRC_LEN];
            loop {
                let (n, _) = self.socket.recv_from(&mut buf)?;
                match parse(&buf[..n]) {
                    Ok(Fragment::Ack) => break,
                    Ok(Fragment::Nak { failed }) => {
                        warn!("receiver NAK'd {} fragment(s)", failed.len());
                        pending.extend(failed.into_iter().map(|i| i as usize));
                        break;
                    }
                    Ok(other) => {
                        debug!("ignoring unexpected fragment while awaiting ack: {other:?}");
                    }
                    Err(err) => {
                        debug!("ignoring malformed datagram while awaiting ack: {err}");
                    }
                }
            }
        }

        Ok(())
    }
}

/// Resolves the requested fragment size into a session-wide `S`, per §4.2:
/// `0` auto-selects `min(payload_len, MAX_FRAGMENT_PAYLOAD)`, anything else
/// is clamped to `min(requested, payload_len)`.
fn resolve_fragment_size(requested: u16, payload_len: usize) -> u16 {
    if requested == 0 {
        payload_len.min(MAX_FRAGMENT_PAYLOAD) as u16
    } else {
        (requested as usize).min(payload_len) as u16
    }
}

/// Splits `data` into chunks of `fragment_size`, with a shorter final chunk.
/// A zero-length payload yields a single empty fragment so the receiver
/// still sees one DATA fragment to complete the transfer on.
fn fragment_payload(data: &[u8], fragment_size: u16) -> Vec<Vec<u8>> {
    if data.is_empty() {
        return vec![Vec::new()];
    }
    data.chunks(fragment_size as usize).map(|c| c.to_vec()).collect()
}
