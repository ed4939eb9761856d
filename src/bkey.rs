//! Secondary keys ("b-keys") of sorted collection elements
//!
//! A sorted collection orders its elements by a b-key that is either an unsigned 64-bit integer
//! or an opaque byte string. Byte b-keys compare as unsigned bytes, lexicographically, with a
//! proper prefix sorting first. A single collection uses one encoding; across encodings every
//! integer b-key sorts before every byte b-key so the order stays total.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Totally ordered secondary key of a sorted collection element
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SecondaryKey {
    /// Fixed-width integer b-key
    Long(u64),
    /// Variable-length byte b-key
    Bytes(Vec<u8>),
}

impl SecondaryKey {
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long(_))
    }

    pub fn as_long(&self) -> Option<u64> {
        match self {
            Self::Long(value) => Some(*value),
            Self::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Long(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }
}

impl From<u64> for SecondaryKey {
    fn from(value: u64) -> Self {
        Self::Long(value)
    }
}

impl From<Vec<u8>> for SecondaryKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for SecondaryKey {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl Display for SecondaryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(value) => write!(f, "{}", value),
            Self::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
        }
    }
}
