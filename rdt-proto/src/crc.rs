use crc::Crc;

/// [CRC-16/IBM error-detecting algorithm](https://en.wikipedia.org/wiki/Cyclic_redundancy_check)
/// (a.k.a. ARC) used to validate the data region of DATA fragments.
pub const FRAGMENT_CRC16: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_ARC);

/// Computes the CRC-16/IBM checksum of `data`.
pub fn checksum(data: &[u8]) -> u16 {
    FRAGMENT_CRC16.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The standard CRC reference check value: CRC-16/IBM of the ASCII string
    /// "123456789" is 0xBB3D. Both peers must agree on this.
    #[test]
    fn reference_check_vector() {
        assert_eq!(checksum(b"123456789"), 0xBB3D);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(checksum(b""), 0x0000);
    }
}
