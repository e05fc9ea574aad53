//! Ledger account / contract addresses.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A 20-byte hex address, always held lower-case.
///
/// Normalizing at construction makes equality case-insensitive, so checksummed
/// and lower-case spellings of the same contract compare equal and build the
/// same metadata key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The ledger's null address. Marks a bid slot that was never filled or already consumed.
    pub fn null() -> Self {
        Self(NULL_ADDRESS.to_string())
    }

    pub fn is_null(&self) -> bool {
        self.0 == NULL_ADDRESS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| TypeError::InvalidAddress(value.clone()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidAddress(value));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
