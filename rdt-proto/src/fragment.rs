use crate::crc;
use crate::error::ParseError;

/// Size in bytes of the fixed fragment header.
pub const HEADER_LEN: usize = 7;

/// Size in bytes of the trailing CRC suffix carried by DATA fragments.
pub const CRC_LEN: usize = 2;

/// Largest payload region a single fragment may carry.
pub const MAX_FRAGMENT_PAYLOAD: usize = 1463;

/// Number of fragments transmitted before the sender blocks for an ack.
pub const BATCH_SIZE: usize = 10;

/// The `type` byte values defined on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FragmentType {
    Init = 1,
    Data = 2,
    Nak = 3,
    KeepAlive = 4,
    Ack = 5,
}

impl TryFrom<u8> for FragmentType {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Init),
            2 => Ok(Self::Data),
            3 => Ok(Self::Nak),
            4 => Ok(Self::KeepAlive),
            5 => Ok(Self::Ack),
            other => Err(ParseError::UnknownType(other)),
        }
    }
}

/// A fully decoded fragment, tagged by its wire type.
///
/// Type 2 covers both the session's opening METADATA fragment and its bulk
/// DATA fragments; nothing on the wire distinguishes them (both are
/// `FragmentType::Data`), the distinction is purely which one a session
/// expects next. `parse` therefore never assumes a trailing CRC on type-2
/// datagrams — it hands back the header fields plus the untouched remainder
/// in `raw`, and the two possible interpretations live in
/// [`read_metadata_payload`] and [`verify_data_crc`]/[`data_payload`], called
/// by whichever phase the receiver is currently in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Type 1 — all header fields zero.
    Init,
    /// Type 2 — `declared_len` is the header's `data_length` field (filename
    /// length in metadata, advertised fragment size in bulk data); `raw` is
    /// the undecoded remainder of the datagram.
    Data {
        declared_len: u16,
        total_n: u16,
        order: u16,
        raw: Vec<u8>,
    },
    /// Type 3 — a negative acknowledgement listing failed/missing indices.
    Nak { failed: Vec<u16> },
    /// Type 4 — all header fields zero.
    KeepAlive,
    /// Type 5 — all header fields zero.
    Ack,
}

/// Builds a control fragment (no trailing CRC).
///
/// `data_length` is always `data.len()` on the wire; callers pass the
/// semantic fields (`total_n`, `order`) separately since for NAK fragments
/// `total_n` carries the *count* of failed indices rather than a transfer
/// size.
pub fn encode_control(fragment_type: FragmentType, total_n: u16, order: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len());
    out.push(fragment_type as u8);
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(&total_n.to_be_bytes());
    out.extend_from_slice(&order.to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// Builds the zero-filled INIT fragment.
pub fn encode_init() -> Vec<u8> {
    encode_control(FragmentType::Init, 0, 0, &[])
}

/// Builds the METADATA fragment announcing a message transfer.
pub fn encode_metadata_message(total_n: u16) -> Vec<u8> {
    encode_control(FragmentType::Data, total_n, 0, &[])
}

/// Builds the METADATA fragment announcing a file transfer.
pub fn encode_metadata_file(total_n: u16, filename: &[u8]) -> Vec<u8> {
    encode_control(FragmentType::Data, total_n, 0, filename)
}

/// Builds the zero-filled ACK fragment.
pub fn encode_ack() -> Vec<u8> {
    encode_control(FragmentType::Ack, 0, 0, &[])
}

/// Builds the zero-filled KEEPALIVE fragment.
pub fn encode_keepalive() -> Vec<u8> {
    encode_control(FragmentType::KeepAlive, 0, 0, &[])
}

/// Builds a NAK fragment listing `failed` indices.
///
/// `data_length` on the wire is `2 * failed.len()`; `total_n` carries the
/// count itself, per the wire format in §6.
pub fn encode_nak(failed: &[u16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(failed.len() * 2);
    for index in failed {
        data.extend_from_slice(&index.to_be_bytes());
    }
    encode_control(FragmentType::Nak, failed.len() as u16, 0, &data)
}

/// Builds a DATA fragment with a trailing CRC-16/IBM over `data`.
///
/// `fragment_size` is the session's advertised fragment size (the header's
/// `data_length` field), which may exceed `data.len()` for the final,
/// shorter fragment of a transfer.
pub fn encode_data(total_n: u16, order: u16, fragment_size: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + CRC_LEN);
    out.push(FragmentType::Data as u8);
    out.extend_from_slice(&fragment_size.to_be_bytes());
    out.extend_from_slice(&total_n.to_be_bytes());
    out.extend_from_slice(&order.to_be_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&crc::checksum(data).to_be_bytes());
    out
}

/// Decodes a raw datagram into a [`Fragment`].
///
/// This is a pure framing step: it never fails on a bad CRC (type-2
/// fragments keep their full, unvalidated remainder in `raw`), only on a
/// malformed header or a truncated NAK index list.
pub fn parse(bytes: &[u8]) -> Result<Fragment, ParseError> {
    if bytes.len() < HEADER_LEN {
        return Err(ParseError::TooShort(HEADER_LEN));
    }

    let fragment_type = FragmentType::try_from(bytes[0])?;
    let data_length = u16::from_be_bytes([bytes[1], bytes[2]]);
    let total_n = u16::from_be_bytes([bytes[3], bytes[4]]);
    let order = u16::from_be_bytes([bytes[5], bytes[6]]);
    let rest = &bytes[HEADER_LEN..];

    match fragment_type {
        FragmentType::Init => Ok(Fragment::Init),
        FragmentType::Ack => Ok(Fragment::Ack),
        FragmentType::KeepAlive => Ok(Fragment::KeepAlive),
        FragmentType::Nak => {
            if rest.len() != data_length as usize || data_length % 2 != 0 {
                return Err(ParseError::MalformedNak);
            }
            let failed = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Ok(Fragment::Nak { failed })
        }
        FragmentType::Data => Ok(Fragment::Data {
            declared_len: data_length,
            total_n,
            order,
            raw: rest.to_vec(),
        }),
    }
}

/// Interprets a type-2 fragment's remainder as a METADATA payload: the raw
/// filename bytes (empty for message mode), with no CRC suffix to strip.
pub fn read_metadata_payload(raw: &[u8]) -> &[u8] {
    raw
}

/// Splits a bulk DATA fragment's remainder into its data region and the
/// CRC-16/IBM value it claims to carry. Returns `None` if the remainder is
/// too short to hold a CRC suffix at all (a malformed/truncated fragment,
/// which the receiver should treat the same as a failed CRC check).
pub fn split_data_crc(raw: &[u8]) -> Option<(&[u8], u16)> {
    if raw.len() < CRC_LEN {
        return None;
    }
    let split = raw.len() - CRC_LEN;
    let (data, crc_bytes) = raw.split_at(split);
    Some((data, u16::from_be_bytes([crc_bytes[0], crc_bytes[1]])))
}

/// Returns the data region of a bulk DATA fragment and whether its trailing
/// CRC-16/IBM matches.
pub fn verify_data_crc(raw: &[u8]) -> (&[u8], bool) {
    match split_data_crc(raw) {
        Some((data, expected)) => (data, crc::checksum(data) == expected),
        None => (raw, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_round_trips() {
        assert_eq!(parse(&encode_init()).unwrap(), Fragment::Init);
    }

    #[test]
    fn ack_round_trips() {
        assert_eq!(parse(&encode_ack()).unwrap(), Fragment::Ack);
    }

    #[test]
    fn keepalive_round_trips() {
        assert_eq!(parse(&encode_keepalive()).unwrap(), Fragment::KeepAlive);
    }

    #[test]
    fn nak_round_trips() {
        let failed = vec![0u16, 4, 7];
        let wire = encode_nak(&failed);
        match parse(&wire).unwrap() {
            Fragment::Nak { failed: got } => assert_eq!(got, failed),
            other => panic!("expected Nak, got {other:?}"),
        }
    }

    #[test]
    fn data_round_trips_with_valid_crc() {
        let wire = encode_data(3, 1, 2, b"ll");
        match parse(&wire).unwrap() {
            Fragment::Data {
                total_n,
                order,
                declared_len,
                raw,
            } => {
                assert_eq!(total_n, 3);
                assert_eq!(order, 1);
                assert_eq!(declared_len, 2);
                let (data, valid) = verify_data_crc(&raw);
                assert_eq!(data, b"ll");
                assert!(valid);
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn data_reports_crc_mismatch_without_erroring() {
        let mut wire = encode_data(3, 0, 2, b"he");
        // Flip a payload byte after encoding, the way the sender's
        // corruption-injection path does.
        wire[HEADER_LEN] ^= 0xFF;
        match parse(&wire).unwrap() {
            Fragment::Data { raw, .. } => {
                let (_, valid) = verify_data_crc(&raw);
                assert!(!valid);
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn metadata_message_round_trips() {
        let wire = encode_metadata_message(3);
        match parse(&wire).unwrap() {
            Fragment::Data {
                total_n,
                declared_len,
                raw,
                ..
            } => {
                assert_eq!(total_n, 3);
                assert_eq!(declared_len, 0);
                assert!(read_metadata_payload(&raw).is_empty());
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn metadata_file_round_trips() {
        let wire = encode_metadata_file(5, b"data.bin");
        match parse(&wire).unwrap() {
            Fragment::Data {
                total_n,
                declared_len,
                raw,
                ..
            } => {
                assert_eq!(total_n, 5);
                assert_eq!(declared_len, 8);
                assert_eq!(read_metadata_payload(&raw), b"data.bin");
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn too_short_is_rejected() {
        assert_eq!(parse(&[1, 2, 3]), Err(ParseError::TooShort(HEADER_LEN)));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut wire = encode_init();
        wire[0] = 0xEE;
        assert_eq!(parse(&wire), Err(ParseError::UnknownType(0xEE)));
    }
}
