//! # Addresses & Assets
//!
//! Principals and token contracts are both identified by a 20-byte
//! [`Address`]. An [`Asset`] is either the native value unit or a token
//! identified by its contract address.
//!
//! Both types serialize as strings (`0x…` hex, or `"native"`) so they can be
//! used as JSON object keys and read from TOML without custom tables.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing an [`Address`] or [`Asset`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input was not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded input had the wrong number of bytes.
    #[error("address must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or token-contract identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Builds a deterministic address whose last byte is `n`. Handy for
    /// tests and fixtures where readable addresses beat random ones.
    pub const fn from_low_u8(n: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = n;
        Self(bytes)
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A unit of value the ledger accounts for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum Asset {
    /// The native value unit (18 decimals).
    Native,
    /// A fungible token, identified by its contract address.
    Token(Address),
}

impl Asset {
    /// String tag used for the native asset in text encodings.
    pub const NATIVE_TAG: &'static str = "native";

    /// Returns the token address, or `None` for the native asset.
    pub fn token_address(&self) -> Option<Address> {
        match self {
            Asset::Native => None,
            Asset::Token(addr) => Some(*addr),
        }
    }

    /// Returns `true` for the native asset.
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str(Self::NATIVE_TAG),
            Asset::Token(addr) => write!(f, "{addr}"),
        }
    }
}

impl FromStr for Asset {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(Self::NATIVE_TAG) {
            Ok(Asset::Native)
        } else {
            Address::from_hex(s).map(Asset::Token)
        }
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Serde helper: u128 amounts as decimal strings
// ---------------------------------------------------------------------------

/// Serde helper for `u128` fields that must survive formats limited to
/// 64-bit integers (TOML). Serializes as a decimal string and accepts either
/// a string or an integer on the way in.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Limits {
///     #[serde(with = "strongbox_protocol::primitives::amount_str")]
///     cap: u128,
/// }
/// ```
pub mod amount_str {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    /// A single amount in string form, for use inside containers.
    #[derive(serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    struct Amount(#[serde(with = "crate::primitives::amount_str")] u128);

    /// `Option<u128>` as an optional decimal string.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        use super::Amount;

        pub fn serialize<S: Serializer>(
            value: &Option<u128>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(Amount).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u128>, D::Error> {
            Ok(Option::<Amount>::deserialize(deserializer)?.map(|a| a.0))
        }
    }

    /// Maps of `u128` amounts with decimal string values.
    pub mod map {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};
        use std::collections::BTreeMap;

        use super::Amount;

        pub fn serialize<K, S>(value: &BTreeMap<K, u128>, serializer: S) -> Result<S::Ok, S::Error>
        where
            K: Serialize,
            S: Serializer,
        {
            serializer.collect_map(value.iter().map(|(k, v)| (k, Amount(*v))))
        }

        pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, u128>, D::Error>
        where
            K: Deserialize<'de> + Ord,
            D: Deserializer<'de>,
        {
            let raw = BTreeMap::<K, Amount>::deserialize(deserializer)?;
            Ok(raw.into_iter().map(|(k, a)| (k, a.0)).collect())
        }
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("amount must be non-negative: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            let digits: String = v.chars().filter(|c| *c != '_').collect();
            digits
                .parse::<u128>()
                .map_err(|e| E::custom(format!("invalid amount {v:?}: {e}")))
        }
    }
}
