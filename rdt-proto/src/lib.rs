//! Wire format for a reliable datagram transport.
//!
//! This crate is the framer/parser layer only: it has no knowledge of
//! sockets, timers, or session state. It defines the fixed 7-byte fragment
//! header, the CRC-16/IBM checksum carried by bulk DATA fragments, and pure
//! encode/parse functions between [`Fragment`] values and their byte-level
//! representation. The stateful sender/receiver machinery that drives a
//! transfer over this wire format lives in `rdt-session`.

mod crc;
mod error;
mod fragment;

pub use crc::{checksum, FRAGMENT_CRC16};
pub use error::ParseError;
pub use fragment::{
    encode_ack, encode_control, encode_data, encode_init, encode_keepalive, encode_metadata_file,
    encode_metadata_message, encode_nak, parse, read_metadata_payload, split_data_crc,
    verify_data_crc, Fragment, FragmentType, BATCH_SIZE, CRC_LEN, HEADER_LEN, MAX_FRAGMENT_PAYLOAD,
};
