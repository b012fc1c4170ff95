//! # Wire Encodings
//!
//! Serde helpers for the hex conventions of the Ethereum JSON-RPC surface:
//!
//! - [`quantity`]: `u64` as `"0x"`-prefixed minimal hex (`"0x1a"`)
//! - [`bytes_hex`]: arbitrary byte strings as `"0x"`-prefixed hex
//! - [`duration`]: `Duration` as a short human string (`"300s"`, `"10m"`, `"500ms"`)

use thiserror::Error;

/// Failures while decoding a hex wire value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("hex string without 0x prefix")]
    MissingPrefix,

    #[error("hex string \"0x\" is not a valid quantity")]
    EmptyQuantity,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("hex number > 64 bits")]
    Overflow,

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Strip the mandatory `0x`/`0X` prefix.
pub fn strip_hex_prefix(value: &str) -> Result<&str, EncodingError> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or(EncodingError::MissingPrefix)
}

/// Parse a hex quantity such as `"0x1b4"`.
pub fn parse_quantity(value: &str) -> Result<u64, EncodingError> {
    let digits = strip_hex_prefix(value)?;
    if digits.is_empty() {
        return Err(EncodingError::EmptyQuantity);
    }
    if digits.len() > 16 {
        return Err(EncodingError::Overflow);
    }
    u64::from_str_radix(digits, 16).map_err(|e| EncodingError::InvalidHex(e.to_string()))
}

/// Format a `u64` as a hex quantity.
pub fn format_quantity(value: u64) -> String {
    format!("{:#x}", value)
}

/// Decode `0x`-prefixed hex bytes.
pub fn decode_hex_bytes(value: &str) -> Result<Vec<u8>, EncodingError> {
    let digits = strip_hex_prefix(value)?;
    hex::decode(digits).map_err(|e| EncodingError::InvalidHex(e.to_string()))
}

/// `u64` <-> hex quantity. Plain JSON integers are accepted on input.
pub mod quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_quantity(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => super::parse_quantity(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// `Vec<u8>` <-> `0x`-prefixed hex.
pub mod bytes_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_hex_bytes(&s).map_err(serde::de::Error::custom)
    }
}

/// `Duration` <-> `"300s"` / `"10m"` / `"500ms"`; bare integers are seconds.
pub mod duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before the bare "s" and "m" suffixes.
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
