use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InvalidIdentity {
    #[error("malformed beacon uuid {text:?}")]
    Uuid {
        text: String,
        #[source]
        source: uuid::Error,
    },
    #[error("major value {0} does not fit in 16 bits")]
    MajorOutOfRange(u32),
    #[error("minor value {0} does not fit in 16 bits")]
    MinorOutOfRange(u32),
}

/// The identity a beacon advertises: a 128-bit UUID plus the 16-bit
/// major/minor pair. The field types carry the range invariants, so a value
/// of this struct is always encodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconIdentity {
    pub uuid: Uuid,
    pub major: u16,
    pub minor: u16,
}

impl BeaconIdentity {
    /// Build an identity from untrusted input (config file, CLI). Rejects
    /// UUID text that is not RFC 4122 and major/minor values wider than 16
    /// bits; out-of-range values are errors, never truncated.
    pub fn parse(uuid: &str, major: u32, minor: u32) -> Result<Self, InvalidIdentity> {
        let uuid = Uuid::parse_str(uuid).map_err(|source| InvalidIdentity::Uuid {
            text: uuid.to_string(),
            source,
        })?;
        let major = u16::try_from(major).map_err(|_| InvalidIdentity::MajorOutOfRange(major))?;
        let minor = u16::try_from(minor).map_err(|_| InvalidIdentity::MinorOutOfRange(minor))?;
        Ok(BeaconIdentity { uuid, major, minor })
    }
}

impl fmt::Display for BeaconIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} major={} minor={}", self.uuid, self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_identity() {
        let identity =
            BeaconIdentity::parse("2f234454-cf6d-4a0f-adf2-f4911ba9ffa6", 17, 42).unwrap();
        assert_eq!(
            identity.uuid,
            Uuid::parse_str("2f234454-cf6d-4a0f-adf2-f4911ba9ffa6").unwrap()
        );
        assert_eq!(identity.major, 17);
        assert_eq!(identity.minor, 42);
    }

    #[test]
    fn parse_accepts_full_u16_range() {
        let identity = BeaconIdentity::parse("00000000-0000-0000-0000-000000000000", 0, 65535);
        assert!(identity.is_ok());
    }

    #[test]
    fn parse_rejects_bad_uuid_text() {
        let err = BeaconIdentity::parse("not-a-uuid", 1, 2).unwrap_err();
        assert!(matches!(err, InvalidIdentity::Uuid { .. }));
    }

    #[test]
    fn parse_rejects_wide_major() {
        let err = BeaconIdentity::parse("2f234454-cf6d-4a0f-adf2-f4911ba9ffa6", 65536, 0)
            .unwrap_err();
        assert!(matches!(err, InvalidIdentity::MajorOutOfRange(65536)));
    }

    #[test]
    fn parse_rejects_wide_minor() {
        let err = BeaconIdentity::parse("2f234454-cf6d-4a0f-adf2-f4911ba9ffa6", 0, 70000)
            .unwrap_err();
        assert!(matches!(err, InvalidIdentity::MinorOutOfRange(70000)));
    }
}
