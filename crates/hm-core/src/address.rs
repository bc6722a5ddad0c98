//! Device address type representing a serial[:channel] pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid device addresses
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address cannot be empty")]
    Empty,

    #[error("address must not contain whitespace")]
    Whitespace,

    #[error("address may contain at most one ':' separator")]
    TooManySeparators,

    #[error("channel part of '{0}' must be a decimal number")]
    InvalidChannel(String),
}

/// Represents a HomeMatic device or channel address (e.g., "LEQ1181007:4")
///
/// The part before the colon is the device serial, the optional part after it
/// is the channel number. Link endpoints are usually channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Create a new address, validating its shape
    pub fn new(address: impl Into<String>) -> Result<Self, AddressError> {
        let address = address.into();

        if address.is_empty() {
            return Err(AddressError::Empty);
        }
        if address.chars().any(char::is_whitespace) {
            return Err(AddressError::Whitespace);
        }

        let mut parts = address.split(':');
        let _serial = parts.next();
        if let Some(channel) = parts.next() {
            if channel.is_empty() || !channel.chars().all(|c| c.is_ascii_digit()) {
                return Err(AddressError::InvalidChannel(address));
            }
        }
        if parts.next().is_some() {
            return Err(AddressError::TooManySeparators);
        }

        Ok(Self(address))
    }

    /// The full address string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Serial number part (everything before the channel separator)
    pub fn serial(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    /// Channel number, if this is a channel address
    pub fn channel(&self) -> Option<u32> {
        self.0.split_once(':').and_then(|(_, c)| c.parse().ok())
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DeviceAddress> for String {
    fn from(address: DeviceAddress) -> String {
        address.0
    }
}

impl AsRef<str> for DeviceAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_address() {
        let addr: DeviceAddress = "LEQ1181007:4".parse().unwrap();
        assert_eq!(addr.serial(), "LEQ1181007");
        assert_eq!(addr.channel(), Some(4));
        assert_eq!(addr.to_string(), "LEQ1181007:4");
    }

    #[test]
    fn test_device_address_without_channel() {
        let addr: DeviceAddress = "JEQ0123456".parse().unwrap();
        assert_eq!(addr.serial(), "JEQ0123456");
        assert_eq!(addr.channel(), None);
    }

    #[test]
    fn test_invalid_addresses() {
        assert_eq!("".parse::<DeviceAddress>().unwrap_err(), AddressError::Empty);
        assert_eq!(
            "LEQ 1181007".parse::<DeviceAddress>().unwrap_err(),
            AddressError::Whitespace
        );
        assert_eq!(
            "A:1:2".parse::<DeviceAddress>().unwrap_err(),
            AddressError::TooManySeparators
        );
        assert!(matches!(
            "A:x".parse::<DeviceAddress>().unwrap_err(),
            AddressError::InvalidChannel(_)
        ));
        assert!(matches!(
            "A:".parse::<DeviceAddress>().unwrap_err(),
            AddressError::InvalidChannel(_)
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let addr = DeviceAddress::new("BidCoS-RF:1").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"BidCoS-RF:1\"");

        let parsed: DeviceAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, addr);

        assert!(serde_json::from_str::<DeviceAddress>("\"\"").is_err());
    }
}
