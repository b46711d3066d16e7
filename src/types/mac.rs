//! Hardware addresses as carried on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::protocol::ParseError;

/// MAC address (6 bytes)
///
/// Rendered as upper-case colon-separated hex (`00:0C:41:A2:0B:11`), which is
/// also the form the server emits and the key used by the network table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0, 0, 0, 0, 0, 0]);

    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for MacAddr {
    type Err = ParseError;

    /// Parse `AA:BB:CC:DD:EE:FF`. Each group is one or two hex digits,
    /// either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMac(s.to_string());

        let mut bytes = [0u8; 6];
        let mut groups = s.split(':');
        for byte in bytes.iter_mut() {
            let group = groups.next().ok_or_else(invalid)?;
            if group.is_empty() || group.len() > 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(group, 16).map_err(|_| invalid())?;
        }
        if groups.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2],
            self.0[3], self.0[4], self.0[5])
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upper_case() {
        let mac: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_parse_lower_and_short_groups() {
        let mac: MacAddr = "0:c:41:a2:b:11".parse().unwrap();
        assert_eq!(mac, MacAddr::new([0x00, 0x0C, 0x41, 0xA2, 0x0B, 0x11]));
        assert_eq!(mac.to_string(), "00:0C:41:A2:0B:11");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("AA:BB:CC:DD:EE".parse::<MacAddr>().is_err());
        assert!("AA:BB:CC:DD:EE:FF:00".parse::<MacAddr>().is_err());
        assert!("AA:BB:CC:DD:EE:GG".parse::<MacAddr>().is_err());
        assert!("AAA:BB:CC:DD:EE:FF".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let mac = MacAddr::new([1, 2, 3, 4, 5, 6]);
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"01:02:03:04:05:06\"");
    }
}
