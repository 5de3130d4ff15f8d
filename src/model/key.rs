//! Client tunnel public keys.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const KEY_LEN: usize = 32;
const LABEL_PREFIX: &str = "wg-";
const LABEL_SUFFIX: &str = "-pubkey";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key is not valid base64")]
    Encoding,
    #[error("key must be {KEY_LEN} bytes, got {0}")]
    Length(usize),
}

/// A 32 byte WireGuard public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey([u8; KEY_LEN]);

impl ClientKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Accepts standard or url-safe base64, padded or not, optionally wrapped
    /// in the `wg-...-pubkey` label form.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let raw = raw.trim();
        let raw = raw.strip_prefix(LABEL_PREFIX).unwrap_or(raw);
        let raw = raw.strip_suffix(LABEL_SUFFIX).unwrap_or(raw);
        let raw = raw.trim_end_matches('=');

        let decoded = if raw.contains(['+', '/']) {
            STANDARD_NO_PAD.decode(raw)
        } else {
            URL_SAFE_NO_PAD.decode(raw)
        }
        .map_err(|_| KeyError::Encoding)?;

        let bytes: [u8; KEY_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Length(decoded.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Url-safe base64 without padding, usable as a path segment.
    pub fn urlsafe(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Form that satisfies control-plane label value rules.
    pub fn label(&self) -> String {
        format!("{}{}{}", LABEL_PREFIX, self.urlsafe(), LABEL_SUFFIX)
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(self.0))
    }
}

impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientKey({})", self)
    }
}

impl FromStr for ClientKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ClientKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClientKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
