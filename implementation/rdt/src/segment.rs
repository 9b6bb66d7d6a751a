//! The wire format of RDT segments.
//!
//! Data segments are laid out as
//!
//! ```text
//! [checksum:1][ack_no:1][seq_no:1][payload:0..MAX_SEGMENT_SIZE]
//! ```
//!
//! and acknowledgments as
//!
//! ```text
//! [checksum:1][ack_no:1]
//! ```
//!
//! The checksum is the XOR of every byte following it. Sequence and
//! acknowledgment numbers live in the ring `[0, 256)`.

use bytes::{BufMut, Bytes, BytesMut};
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    num::Wrapping,
};

/// The length of an acknowledgment segment in bytes.
pub const ACK_LEN: usize = 2;

/// The length of a data segment's header in bytes.
pub const DATA_HEADER_LEN: usize = 3;

/// A segment carrying payload from the sender to the receiver.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct DataSegment {
    /// Always zero on data segments.
    pub ack_no: u8,
    pub payload: Bytes,
    pub seq_no: u8,
}

/// An acknowledgment from the receiver.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct AckSegment {
    /// The sequence number the receiver expects next.
    pub ack_no: u8,
}

/// The error when a datagram cannot be decoded into a segment.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DecodeError {
    /// The datagram is shorter than the fixed header.
    Truncated { needed: usize, actual: usize },

    /// The datagram has the wrong length for its segment type.
    Length { expected: usize, actual: usize },

    /// The transmitted checksum doesn't match the contents.
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Computes the checksum over the given bytes, which must not include the
/// checksum field itself.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Checks whether the leading checksum byte of `datagram` matches the rest
/// of it.
///
/// An empty datagram never verifies.
pub fn verify(datagram: &[u8]) -> bool {
    match datagram.split_first() {
        Some((&sum, rest)) => sum == checksum(rest),
        None => false,
    }
}

/// Advances a sequence number by `len` bytes in the `[0, 256)` ring.
pub fn advance(seq_no: u8, len: usize) -> u8 {
    (Wrapping(seq_no) + Wrapping((len % 256) as u8)).0
}

/// Overwrites the checksum placeholder at the front of `buf`.
fn seal(buf: &mut BytesMut) {
    buf[0] = checksum(&buf[1..]);
}

/// Verifies the checksum of a datagram that is known to be non-empty.
fn check(datagram: &[u8]) -> Result<(), DecodeError> {
    let expected = checksum(&datagram[1..]);
    let actual = datagram[0];

    if expected != actual {
        return Err(DecodeError::ChecksumMismatch { expected, actual });
    }

    Ok(())
}

impl DataSegment {
    /// Creates a data segment. The ACK number is zero.
    pub fn new(seq_no: u8, payload: impl Into<Bytes>) -> Self {
        DataSegment {
            ack_no: 0,
            payload: payload.into(),
            seq_no,
        }
    }

    /// Gets the length of the segment in serialized form.
    pub fn binary_len(&self) -> usize {
        DATA_HEADER_LEN + self.payload.len()
    }

    /// The sequence number that acknowledges this segment.
    pub fn next_seq_no(&self) -> u8 {
        advance(self.seq_no, self.payload.len())
    }

    /// Parses a data segment from a received datagram and verifies its
    /// checksum.
    pub fn read_from(datagram: &Bytes) -> Result<Self, DecodeError> {
        assert_size!(datagram, DATA_HEADER_LEN);
        check(datagram)?;

        Ok(DataSegment {
            ack_no: datagram[1],
            payload: datagram.slice_from(DATA_HEADER_LEN),
            seq_no: datagram[2],
        })
    }

    /// Appends the segment including its checksum to the given buffer.
    pub fn write_to(&self, buf: &mut BytesMut) {
        let mut sgmt = BytesMut::with_capacity(self.binary_len());
        sgmt.put_u8(0);
        sgmt.put_u8(self.ack_no);
        sgmt.put_u8(self.seq_no);
        sgmt.put_slice(&self.payload);
        seal(&mut sgmt);

        buf.extend_from_slice(&sgmt);
    }

    /// Writes the segment into a new buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.binary_len());
        self.write_to(&mut buf);
        buf.freeze()
    }
}

impl AckSegment {
    pub fn new(ack_no: u8) -> Self {
        AckSegment { ack_no }
    }

    /// Parses an acknowledgment from a received datagram and verifies its
    /// checksum.
    pub fn read_from(datagram: &Bytes) -> Result<Self, DecodeError> {
        assert_size!(datagram, ACK_LEN);
        if datagram.len() != ACK_LEN {
            return Err(DecodeError::Length {
                expected: ACK_LEN,
                actual: datagram.len(),
            });
        }
        check(datagram)?;

        Ok(AckSegment { ack_no: datagram[1] })
    }

    /// Appends the acknowledgment including its checksum to the given buffer.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.reserve(ACK_LEN);
        buf.put_u8(checksum(&[self.ack_no]));
        buf.put_u8(self.ack_no);
    }

    /// Writes the acknowledgment into a new buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ACK_LEN);
        self.write_to(&mut buf);
        buf.freeze()
    }
}

impl From<DataSegment> for Bytes {
    fn from(sgmt: DataSegment) -> Self {
        sgmt.to_bytes()
    }
}

impl From<AckSegment> for Bytes {
    fn from(sgmt: AckSegment) -> Self {
        sgmt.to_bytes()
    }
}

impl Display for DecodeError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match *self {
            DecodeError::Truncated { needed, actual } => write!(
                fmt,
                "truncated segment: got {} bytes, need at least {}",
                actual, needed,
            ),
            DecodeError::Length { expected, actual } => write!(
                fmt,
                "invalid segment length: got {} bytes, wanted {}",
                actual, expected,
            ),
            DecodeError::ChecksumMismatch { expected, actual } => write!(
                fmt,
                "checksum mismatch: got {:02X}, wanted {:02X}",
                actual, expected,
            ),
        }
    }
}

impl StdError for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_layout() {
        let sgmt = DataSegment::new(7, &b"ab"[..]);
        let wire = sgmt.to_bytes();

        assert_eq!(wire.len(), sgmt.binary_len());
        assert_eq!(&wire[1..], &[0, 7, b'a', b'b'][..]);
        assert_eq!(wire[0], 7 ^ b'a' ^ b'b');
    }

    #[test]
    fn ack_layout() {
        let wire = AckSegment::new(0x5A).to_bytes();
        assert_eq!(&wire[..], &[0x5A, 0x5A][..]);
    }

    #[test]
    fn parse_data() {
        let sgmt = DataSegment::new(200, vec![1, 2, 3, 4]);
        let parsed = DataSegment::read_from(&sgmt.to_bytes()).unwrap();

        assert_eq!(parsed, sgmt);
    }

    #[test]
    fn parse_empty_payload() {
        let sgmt = DataSegment::new(3, Bytes::new());
        let wire = sgmt.to_bytes();

        assert_eq!(wire.len(), DATA_HEADER_LEN);
        assert_eq!(DataSegment::read_from(&wire).unwrap(), sgmt);
    }

    #[test]
    fn verify_detects_every_single_bit_flip() {
        let payloads: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            vec![0xFF; 17],
            (0..=255).collect(),
        ];

        for payload in payloads {
            let wire = DataSegment::new(42, payload).to_bytes();
            assert!(verify(&wire));

            for byte in 0..wire.len() {
                for bit in 0..8 {
                    let mut flipped = wire.to_vec();
                    flipped[byte] ^= 1 << bit;
                    assert!(!verify(&flipped), "flip {}:{} undetected", byte, bit);
                }
            }
        }
    }

    #[test]
    fn verify_rejects_empty() {
        assert!(!verify(&[]));
    }

    #[test]
    fn corrupt_data_is_rejected() {
        let mut wire = DataSegment::new(9, &b"hello"[..]).to_bytes().to_vec();
        wire[4] ^= 0x10;

        match DataSegment::read_from(&wire.into()) {
            Err(DecodeError::ChecksumMismatch { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn short_datagrams_are_rejected() {
        assert_eq!(
            DataSegment::read_from(&Bytes::from(&[0u8, 0][..])),
            Err(DecodeError::Truncated { needed: 3, actual: 2 }),
        );
        assert_eq!(
            AckSegment::read_from(&Bytes::from(&[0u8][..])),
            Err(DecodeError::Truncated { needed: 2, actual: 1 }),
        );
    }

    #[test]
    fn ack_with_trailing_bytes_is_rejected() {
        let wire = Bytes::from(&[0u8, 0, 0][..]);
        assert_eq!(
            AckSegment::read_from(&wire),
            Err(DecodeError::Length { expected: 2, actual: 3 }),
        );
    }

    #[test]
    fn ring_arithmetic_wraps() {
        assert_eq!(advance(250, 10), 4);
        assert_eq!(advance(0, 250), 250);
        assert_eq!(advance(255, 1), 0);
        assert_eq!(DataSegment::new(250, vec![0; 10]).next_seq_no(), 4);
    }
}
