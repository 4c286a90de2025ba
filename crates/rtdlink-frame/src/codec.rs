use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::markers::{is_delimiter, marker_name, EOT, ETB, SOH, STX, SYN};

/// Header literal sent by scoreboard controllers.
pub const DEVICE_HEADER: [u8; 8] = *b"20000000";

/// Control block prefix used when encoding; the last four digits carry the offset.
pub const CONTROL_PREFIX: [u8; 6] = *b"004010";

/// Smallest possible frame: the envelope around an empty payload.
pub const MIN_FRAME_LEN: usize = 25;

/// Largest offset expressible in the four control digits.
pub const MAX_OFFSET: usize = 9999;

/// Fixed acknowledgement written back after every accepted frame.
///
/// `SYN "20000000" SOH "90000" EOT "80" ETB`; `80` is the checksum of the
/// bytes between SYN and the trailer.
pub const ACK_FRAME: [u8; 19] = [
    SYN, b'2', b'0', b'0', b'0', b'0', b'0', b'0', b'0', SOH, b'9', b'0', b'0', b'0', b'0', EOT,
    b'8', b'0', ETB,
];

const HEADER_RANGE: std::ops::Range<usize> = 1..9;
const SOH_POS: usize = 9;
const CONTROL_RANGE: std::ops::Range<usize> = 10..20;
const OFFSET_RANGE: std::ops::Range<usize> = 16..20;
const TEXT_START: usize = 21;
/// Bytes after the text: EOT, two checksum digits, ETB.
const TRAILER_LEN: usize = 4;

/// Outcome of comparing the computed checksum with the frame trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    Mismatch { computed: u8, received: [u8; 2] },
}

impl ChecksumStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChecksumStatus::Valid)
    }
}

/// A structurally valid RTD frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtdFrame {
    /// The eight header bytes following SYN.
    pub header: [u8; 8],
    /// The ten control bytes following SOH.
    pub control: [u8; 10],
    /// Buffer offset parsed from the last four control digits.
    pub offset: usize,
    /// Payload to place at `offset`.
    pub text: Bytes,
    /// Result of the checksum comparison.
    pub checksum: ChecksumStatus,
}

impl RtdFrame {
    /// True when the header is the literal controllers send.
    pub fn has_device_header(&self) -> bool {
        self.header == DEVICE_HEADER
    }

    /// The payload as text, with invalid UTF-8 replaced.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_LEN + self.text.len()
    }

    /// Strict-mode view: a checksum mismatch becomes an error.
    pub fn verify_checksum(&self) -> Result<()> {
        match self.checksum {
            ChecksumStatus::Valid => Ok(()),
            ChecksumStatus::Mismatch { computed, received } => Err(FrameError::ChecksumMismatch {
                computed,
                received: String::from_utf8_lossy(&received).into_owned(),
            }),
        }
    }
}

/// Sum of byte values modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Render a checksum the way controllers do: two uppercase hex digits.
pub fn checksum_digits(sum: u8) -> [u8; 2] {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    [HEX[(sum >> 4) as usize], HEX[(sum & 0x0F) as usize]]
}

/// Decode a complete SYN..ETB frame.
///
/// Wire format (0-indexed, `N` = frame length):
/// ```text
/// ┌─────┬──────────┬─────┬────────────┬─────┬────────┬─────┬─────┬─────┐
/// │ SYN │ HEADER   │ SOH │ CONTROL    │ STX │ TEXT   │ EOT │ SUM │ ETB │
/// │ 0   │ 1..=8    │ 9   │ 10..=19    │ 20  │ 21..   │ N-4 │ 2B  │ N-1 │
/// └─────┴──────────┴─────┴────────────┴─────┴────────┴─────┴─────┴─────┘
/// ```
/// Control bytes 16..=19 hold the decimal offset. `SUM` is the checksum of
/// bytes 1 through N-4 (header through EOT) as hex.
///
/// A checksum mismatch is reported in [`RtdFrame::checksum`], not as an error.
pub fn decode_frame(raw: &Bytes) -> Result<RtdFrame> {
    let len = raw.len();
    if len < MIN_FRAME_LEN {
        return Err(FrameError::TooShort {
            len,
            min: MIN_FRAME_LEN,
        });
    }

    let eot_pos = len - TRAILER_LEN;
    expect_marker(raw, 0, SYN)?;
    expect_marker(raw, SOH_POS, SOH)?;
    expect_marker(raw, eot_pos, EOT)?;
    expect_marker(raw, len - 1, ETB)?;

    let digits = &raw[OFFSET_RANGE];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(FrameError::InvalidOffset(
            String::from_utf8_lossy(digits).into_owned(),
        ));
    }
    let offset = digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));

    let mut header = [0u8; 8];
    header.copy_from_slice(&raw[HEADER_RANGE]);
    let mut control = [0u8; 10];
    control.copy_from_slice(&raw[CONTROL_RANGE]);

    let computed = checksum(&raw[1..=eot_pos]);
    let received = [raw[len - 3], raw[len - 2]];
    let checksum = if received.eq_ignore_ascii_case(&checksum_digits(computed)) {
        ChecksumStatus::Valid
    } else {
        ChecksumStatus::Mismatch { computed, received }
    };

    Ok(RtdFrame {
        header,
        control,
        offset,
        text: raw.slice(TEXT_START..eot_pos),
        checksum,
    })
}

fn expect_marker(raw: &[u8], position: usize, marker: u8) -> Result<()> {
    if raw[position] == marker {
        Ok(())
    } else {
        Err(FrameError::BadMarker {
            position,
            expected: marker_name(marker),
            found: raw[position],
        })
    }
}

/// Encode `text` at `offset` the way a controller would.
///
/// Uses the device header and the `004010NNNN` control block, and appends a
/// correct checksum.
pub fn encode_frame(offset: usize, text: &[u8], dst: &mut BytesMut) -> Result<()> {
    if offset > MAX_OFFSET {
        return Err(FrameError::OffsetOutOfRange(offset));
    }
    if let Some(index) = text.iter().position(|&b| is_delimiter(b)) {
        return Err(FrameError::ReservedByte {
            byte: text[index],
            index,
        });
    }

    let start = dst.len();
    dst.reserve(MIN_FRAME_LEN + text.len());
    dst.put_u8(SYN);
    dst.put_slice(&DEVICE_HEADER);
    dst.put_u8(SOH);
    dst.put_slice(&CONTROL_PREFIX);
    dst.put_slice(format!("{offset:04}").as_bytes());
    dst.put_u8(STX);
    dst.put_slice(text);
    dst.put_u8(EOT);
    let sum = checksum(&dst[start + 1..]);
    dst.put_slice(&checksum_digits(sum));
    dst.put_u8(ETB);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(offset: usize, text: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        encode_frame(offset, text, &mut buf).unwrap();
        buf.freeze()
    }

    /// Replace the two checksum digits of an encoded frame.
    fn with_trailer(raw: &Bytes, digits: &[u8; 2]) -> Bytes {
        let mut bytes = raw.to_vec();
        let len = bytes.len();
        bytes[len - 3..len - 1].copy_from_slice(digits);
        Bytes::from(bytes)
    }

    #[test]
    fn test_checksum_is_byte_sum_mod_256() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(checksum(b"20000000"), (0x32 + 7 * 0x30) as u8);
    }

    #[test]
    fn test_ack_frame_layout() {
        assert_eq!(ACK_FRAME.len(), 19);
        assert_eq!(ACK_FRAME[0], SYN);
        assert_eq!(&ACK_FRAME[1..9], &DEVICE_HEADER);
        assert_eq!(ACK_FRAME[18], ETB);
        // The trailer is the checksum of header through EOT.
        assert_eq!(checksum_digits(checksum(&ACK_FRAME[1..16])), *b"80");
    }

    #[test]
    fn test_decode_known_fixture() {
        // Header + SOH + "0040100000" + STX + "HOME" + EOT sums to 1175 = 0x97 mod 256.
        let mut wire = Vec::new();
        wire.push(SYN);
        wire.extend_from_slice(b"20000000");
        wire.push(SOH);
        wire.extend_from_slice(b"0040100000");
        wire.push(STX);
        wire.extend_from_slice(b"HOME");
        wire.push(EOT);
        wire.extend_from_slice(b"97");
        wire.push(ETB);
        let raw = Bytes::from(wire);

        let frame = decode_frame(&raw).unwrap();
        assert_eq!(frame.offset, 0);
        assert_eq!(frame.text.as_ref(), b"HOME");
        assert!(frame.has_device_header());
        assert_eq!(&frame.control, b"0040100000");
        assert_eq!(frame.checksum, ChecksumStatus::Valid);
        assert_eq!(frame.wire_size(), raw.len());
    }

    #[test]
    fn test_encoded_frame_matches_fixture() {
        let raw = frame(0, b"HOME");
        assert_eq!(&raw[raw.len() - 3..raw.len() - 1], b"97");
        assert_eq!(raw.len(), MIN_FRAME_LEN + 4);
    }

    #[test]
    fn test_decode_parses_offset_digits() {
        let decoded = decode_frame(&frame(1234, b"12")).unwrap();
        assert_eq!(decoded.offset, 1234);
        assert_eq!(&decoded.control[..6], &CONTROL_PREFIX);
        assert_eq!(decoded.text_lossy(), "12");
    }

    #[test]
    fn test_decode_empty_text() {
        let decoded = decode_frame(&frame(7, b"")).unwrap();
        assert_eq!(decoded.offset, 7);
        assert!(decoded.text.is_empty());
        assert!(decoded.checksum.is_valid());
    }

    #[test]
    fn test_checksum_comparison_ignores_case() {
        // "=" brings the sum to 0xAB, so the trailer has letters.
        let raw = frame(0, b"=");
        let digits = [raw[raw.len() - 3], raw[raw.len() - 2]];
        let lower = [digits[0].to_ascii_lowercase(), digits[1].to_ascii_lowercase()];
        assert_eq!(&digits, b"AB");
        let decoded = decode_frame(&with_trailer(&raw, &lower)).unwrap();
        assert!(decoded.checksum.is_valid());
    }

    #[test]
    fn test_wrong_checksum_is_reported_not_rejected() {
        let raw = with_trailer(&frame(3, b"AWAY"), b"00");
        let decoded = decode_frame(&raw).unwrap();
        assert_eq!(decoded.text.as_ref(), b"AWAY");
        match decoded.checksum {
            ChecksumStatus::Mismatch { received, .. } => assert_eq!(&received, b"00"),
            ChecksumStatus::Valid => panic!("expected mismatch"),
        }
        assert!(matches!(
            decoded.verify_checksum(),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_non_hex_trailer_is_a_mismatch() {
        let raw = with_trailer(&frame(3, b"AWAY"), b"ZZ");
        let decoded = decode_frame(&raw).unwrap();
        assert!(!decoded.checksum.is_valid());
    }

    #[test]
    fn test_foreign_header_is_accepted() {
        let mut bytes = frame(0, b"X").to_vec();
        bytes[1..9].copy_from_slice(b"30000000");
        let decoded = decode_frame(&Bytes::from(bytes)).unwrap();
        assert!(!decoded.has_device_header());
        // Header bytes are part of the checksum, so it no longer matches.
        assert!(!decoded.checksum.is_valid());
    }

    #[test]
    fn test_decode_too_short() {
        let raw = Bytes::from_static(&[SYN, b'2', ETB]);
        let err = decode_frame(&raw).unwrap_err();
        assert!(matches!(err, FrameError::TooShort { len: 3, .. }));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_decode_missing_syn() {
        let mut bytes = frame(0, b"X").to_vec();
        bytes[0] = b'?';
        let err = decode_frame(&Bytes::from(bytes)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BadMarker {
                position: 0,
                expected: "SYN",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_misplaced_eot() {
        let mut bytes = frame(0, b"ABC").to_vec();
        let len = bytes.len();
        bytes[len - 4] = b'!';
        let err = decode_frame(&Bytes::from(bytes)).unwrap_err();
        assert!(matches!(err, FrameError::BadMarker { expected: "EOT", .. }));
    }

    #[test]
    fn test_decode_non_numeric_offset() {
        let mut bytes = frame(0, b"X").to_vec();
        bytes[17] = b'A';
        let err = decode_frame(&Bytes::from(bytes)).unwrap_err();
        assert!(matches!(err, FrameError::InvalidOffset(ref d) if d == "0A00"));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_encode_rejects_large_offset() {
        let mut buf = BytesMut::new();
        let err = encode_frame(10_000, b"X", &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::OffsetOutOfRange(10_000)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_rejects_delimiters_in_text() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0, &[b'A', ETB], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ReservedByte { byte: ETB, index: 1 }));
    }

    #[test]
    fn test_encode_appends_after_existing_bytes() {
        let mut buf = BytesMut::from(&b"noise"[..]);
        encode_frame(42, b"7", &mut buf).unwrap();
        let raw = buf.freeze().slice(5..);
        let decoded = decode_frame(&raw).unwrap();
        assert_eq!(decoded.offset, 42);
        assert!(decoded.checksum.is_valid());
    }
}
