//! On-wire frame layout: encoding and body validation.
//!
//! A frame is `START, LENGTH, TYPE, MESSAGE_ID, payload…, CHECKSUM`, where
//! LENGTH counts everything after itself (TYPE + MESSAGE_ID + payload +
//! CHECKSUM) and the checksum is the CRC-8 of LENGTH, TYPE, MESSAGE_ID and
//! the payload in order.
//!
//! [`encode`] produces the complete byte sequence for transmission.
//! Decoding is split: the engine's reassembly state machine collects a body
//! byte-by-byte (it is driven by single bytes as they arrive), then hands the
//! accumulated body to [`parse_body`], which either yields a validated
//! [`Frame`] or `None`. `None` always means "drop silently and continue":
//! a corrupt or unrecognized frame is a discarded event, never an error.

use crate::consts::{MAX_BODY_LEN, MAX_FRAME_LEN, MAX_PAYLOAD, MIN_BODY_LEN, START_BYTE};
use crate::crc::crc8_update;
use heapless::Vec;

/// Frame type discriminator carried in the body's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameType {
    /// Device discovery. Payload byte 0 carries the sender's device id.
    Hello = 0,
    /// Application payload.
    Data = 1,
    /// Acknowledgment, echoing the MESSAGE_ID of the frame it confirms.
    Ack = 2,
}

impl FrameType {
    /// Decodes a wire byte; unknown values are not a frame type.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FrameType::Hello),
            1 => Some(FrameType::Data),
            2 => Some(FrameType::Ack),
            _ => None,
        }
    }

    /// The wire byte for this frame type.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A validated frame body, borrowed from the reassembly buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Frame type.
    pub kind: FrameType,
    /// Sender-assigned message id (echoed for ACK frames).
    pub msg_id: u8,
    /// Application payload, empty for ACKs.
    pub payload: &'a [u8],
}

/// Encodes a complete frame ready for byte-by-byte transmission.
///
/// Payloads longer than [`MAX_PAYLOAD`] are truncated, matching the send
/// path's clamp, so an encoded frame always fits [`MAX_FRAME_LEN`].
pub fn encode(kind: FrameType, msg_id: u8, payload: &[u8]) -> Vec<u8, MAX_FRAME_LEN> {
    let payload = &payload[..payload.len().min(MAX_PAYLOAD)];
    let body_len = (2 + payload.len() + 1) as u8;

    let mut crc = crc8_update(0, body_len);
    crc = crc8_update(crc, kind.as_byte());
    crc = crc8_update(crc, msg_id);
    for &b in payload {
        crc = crc8_update(crc, b);
    }

    // Cannot overflow: 2 + MAX_BODY_LEN == MAX_FRAME_LEN.
    let mut out = Vec::new();
    let _ = out.push(START_BYTE);
    let _ = out.push(body_len);
    let _ = out.push(kind.as_byte());
    let _ = out.push(msg_id);
    let _ = out.extend_from_slice(payload);
    let _ = out.push(crc);
    out
}

/// Validates a reassembled frame body.
///
/// Recomputes the checksum over the implied LENGTH and the body contents and
/// compares it to the trailing byte, then decodes the type. `None` means the
/// frame is discarded with no further action.
pub fn parse_body(body: &[u8]) -> Option<Frame<'_>> {
    if body.len() < MIN_BODY_LEN || body.len() > MAX_BODY_LEN {
        return None;
    }

    let type_byte = body[0];
    let msg_id = body[1];
    let payload = &body[2..body.len() - 1];
    let received = body[body.len() - 1];

    let mut crc = crc8_update(0, body.len() as u8);
    crc = crc8_update(crc, type_byte);
    crc = crc8_update(crc, msg_id);
    for &b in payload {
        crc = crc8_update(crc, b);
    }
    if crc != received {
        return None;
    }

    let kind = FrameType::from_byte(type_byte)?;
    Some(Frame {
        kind,
        msg_id,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ack_layout() {
        // Hand-computed vector: CRC-8(0x03, 0x02, 0x07) == 0x82.
        let bytes = encode(FrameType::Ack, 0x07, &[]);
        assert_eq!(&bytes[..], &[0xA5, 0x03, 0x02, 0x07, 0x82]);
    }

    #[test]
    fn test_encode_data_layout() {
        let bytes = encode(FrameType::Data, 0x2A, &[0x10, 0x20, 0x30]);
        assert_eq!(bytes.len(), 2 + 2 + 3 + 1);
        assert_eq!(bytes[0], START_BYTE);
        assert_eq!(bytes[1], 6); // type + id + 3 payload + crc
        assert_eq!(bytes[2], FrameType::Data.as_byte());
        assert_eq!(bytes[3], 0x2A);
        assert_eq!(&bytes[4..7], &[0x10, 0x20, 0x30]);
    }

    #[test]
    fn test_round_trip_all_types() {
        for kind in [FrameType::Hello, FrameType::Data, FrameType::Ack] {
            let payload = [1, 2, 3, 4, 5];
            let bytes = encode(kind, 0xC3, &payload);
            let frame = parse_body(&bytes[2..]).expect("valid frame rejected");
            assert_eq!(frame.kind, kind);
            assert_eq!(frame.msg_id, 0xC3);
            assert_eq!(frame.payload, &payload);
        }
    }

    #[test]
    fn test_round_trip_empty_and_max_payload() {
        let empty = encode(FrameType::Data, 1, &[]);
        let expected: &[u8] = &[];
        assert_eq!(parse_body(&empty[2..]).unwrap().payload, expected);

        let max = [0xAAu8; MAX_PAYLOAD];
        let bytes = encode(FrameType::Data, 1, &max);
        assert_eq!(bytes.len(), MAX_FRAME_LEN);
        assert_eq!(parse_body(&bytes[2..]).unwrap().payload, &max);
    }

    #[test]
    fn test_oversize_payload_truncated() {
        let long = [7u8; MAX_PAYLOAD + 4];
        let bytes = encode(FrameType::Data, 9, &long);
        let frame = parse_body(&bytes[2..]).unwrap();
        assert_eq!(frame.payload.len(), MAX_PAYLOAD);
    }

    #[test]
    fn test_corrupt_body_rejected() {
        let bytes = encode(FrameType::Data, 5, &[10, 20, 30]);
        let body = &bytes[2..];
        for i in 0..body.len() {
            for bit in 0..8 {
                let mut corrupt: Vec<u8, MAX_BODY_LEN> = Vec::from_slice(body).unwrap();
                corrupt[i] ^= 1 << bit;
                assert!(
                    parse_body(&corrupt).is_none(),
                    "flip of body byte {i} bit {bit} got through"
                );
            }
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        // Valid checksum over an out-of-range TYPE byte must still drop.
        let mut bytes = encode(FrameType::Ack, 1, &[]);
        bytes[2] = 3;
        let mut crc = crc8_update(0, bytes[1]);
        crc = crc8_update(crc, bytes[2]);
        crc = crc8_update(crc, bytes[3]);
        let last = bytes.len() - 1;
        bytes[last] = crc;
        assert!(parse_body(&bytes[2..]).is_none());
    }

    #[test]
    fn test_bad_body_lengths_rejected() {
        assert!(parse_body(&[]).is_none());
        assert!(parse_body(&[1, 2]).is_none());
        assert!(parse_body(&[0u8; MAX_BODY_LEN + 1]).is_none());
    }
}
