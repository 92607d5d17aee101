use std::io;
use thiserror::Error;

use rdt_proto::ParseError;

/// Errors a [`crate::sender::Sender`] can surface to its driver.
///
/// Per §7, a handshake timeout is fatal to the current transfer and is never
/// retried automatically — the caller decides whether to start over.
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("received a malformed datagram while awaiting an ack: {0}")]
    Parse(#[from] ParseError),

    #[error("handshake timed out waiting for an INIT echo")]
    HandshakeTimeout,

    #[error("received an unexpected fragment type while awaiting a batch ack")]
    UnexpectedFragment,
}

/// Errors a [`crate::receiver::Receiver`] can surface to its driver.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("received a malformed datagram: {0}")]
    Parse(#[from] ParseError),

    #[error("message payload was not valid UTF-8/ASCII text")]
    InvalidMessageEncoding(#[from] std::string::FromUtf8Error),

    #[error("metadata fragment did not carry a valid filename")]
    InvalidFilename,
}
