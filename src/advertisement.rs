//! Encoding and decoding of the iBeacon manufacturer-specific-data payload.
//!
//! The 23-byte value sits under a 16-bit company identifier in the
//! advertisement's manufacturer-data map; the company id itself is the map
//! key and is not repeated inside the payload.

use thiserror::Error;
use uuid::Uuid;

use crate::beacon::BeaconIdentity;

/// Length of the manufacturer-data value: 2-byte type/length header, 16-byte
/// UUID, 2-byte major, 2-byte minor, 1-byte calibrated power.
pub const PAYLOAD_LEN: usize = 23;

/// iBeacon type (0x02) and remaining length (0x15) prefix.
const FRAME_HEADER: [u8; 2] = [0x02, 0x15];

/// Reference RSSI at one meter, advertised so receivers can estimate
/// distance.
pub const DEFAULT_CALIBRATED_POWER: i8 = -59;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedFrame {
    #[error("manufacturer payload is {0} bytes, expected {PAYLOAD_LEN}")]
    UnexpectedLength(usize),
    #[error("payload header {0:#04x} {1:#04x} is not the iBeacon type/length prefix")]
    UnexpectedHeader(u8, u8),
}

/// The fields recovered from a well-formed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAdvertisement {
    pub identity: BeaconIdentity,
    pub calibrated_power: i8,
}

/// Lay out `identity` and `calibrated_power` as the fixed 23-byte iBeacon
/// payload. UUID bytes and the major/minor fields are written in network
/// byte order.
pub fn encode(identity: &BeaconIdentity, calibrated_power: i8) -> [u8; PAYLOAD_LEN] {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[0..2].copy_from_slice(&FRAME_HEADER);
    payload[2..18].copy_from_slice(identity.uuid.as_bytes());
    payload[18..20].copy_from_slice(&identity.major.to_be_bytes());
    payload[20..22].copy_from_slice(&identity.minor.to_be_bytes());
    payload[22] = calibrated_power as u8;
    payload
}

/// Reassemble a manufacturer-data value into the advertised identity and
/// calibrated power. Rejects payloads of the wrong length or without the
/// iBeacon header; any 16 bytes form a UUID, so those are the only failure
/// modes.
pub fn decode(payload: &[u8]) -> Result<DecodedAdvertisement, MalformedFrame> {
    if payload.len() != PAYLOAD_LEN {
        return Err(MalformedFrame::UnexpectedLength(payload.len()));
    }
    if payload[0..2] != FRAME_HEADER {
        return Err(MalformedFrame::UnexpectedHeader(payload[0], payload[1]));
    }

    let mut uuid_bytes = [0u8; 16];
    uuid_bytes.copy_from_slice(&payload[2..18]);

    Ok(DecodedAdvertisement {
        identity: BeaconIdentity {
            uuid: Uuid::from_bytes(uuid_bytes),
            major: u16::from_be_bytes([payload[18], payload[19]]),
            minor: u16::from_be_bytes([payload[20], payload[21]]),
        },
        calibrated_power: payload[22] as i8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(major: u16, minor: u16) -> BeaconIdentity {
        BeaconIdentity {
            uuid: Uuid::parse_str("2f234454-cf6d-4a0f-adf2-f4911ba9ffa6").unwrap(),
            major,
            minor,
        }
    }

    #[test]
    fn encode_layout() {
        let payload = encode(&identity(0x1234, 0xABCD), -59);
        assert_eq!(payload.len(), PAYLOAD_LEN);
        assert_eq!(payload[0..2], [0x02, 0x15]);
        assert_eq!(
            payload[2..18],
            [
                0x2f, 0x23, 0x44, 0x54, 0xcf, 0x6d, 0x4a, 0x0f, 0xad, 0xf2, 0xf4, 0x91, 0x1b,
                0xa9, 0xff, 0xa6
            ]
        );
        assert_eq!(payload[18..20], [0x12, 0x34]);
        assert_eq!(payload[20..22], [0xAB, 0xCD]);
        assert_eq!(payload[22] as i8, -59);
    }

    #[test]
    fn round_trip() {
        for (major, minor, power) in [
            (0u16, 0u16, -128i8),
            (1, 2, -59),
            (65535, 65535, 0),
            (0x0100, 0x0001, 127),
        ] {
            let id = identity(major, minor);
            let decoded = decode(&encode(&id, power)).unwrap();
            assert_eq!(decoded.identity, id);
            assert_eq!(decoded.calibrated_power, power);
        }
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(decode(&[0x02, 0x15]), Err(MalformedFrame::UnexpectedLength(2)));
        assert_eq!(decode(&[0u8; 24]), Err(MalformedFrame::UnexpectedLength(24)));
        assert_eq!(decode(&[]), Err(MalformedFrame::UnexpectedLength(0)));
    }

    #[test]
    fn decode_rejects_bad_header() {
        let mut payload = encode(&identity(1, 2), -59);
        payload[1] = 0x16;
        assert_eq!(
            decode(&payload),
            Err(MalformedFrame::UnexpectedHeader(0x02, 0x16))
        );
    }

    #[test]
    fn decode_is_total_over_body_bytes() {
        let mut payload = [0xFFu8; PAYLOAD_LEN];
        payload[0] = 0x02;
        payload[1] = 0x15;
        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded.identity.major, 0xFFFF);
        assert_eq!(decoded.calibrated_power, -1);
    }
}
