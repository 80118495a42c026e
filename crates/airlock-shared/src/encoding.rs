//! Text encodings for binary fields.
//!
//! Login documents carry bytes as text in three alphabets: base32 for OTP
//! secrets, base16 for box IVs and key-derivation salts, and base64 for
//! everything else. Each field's schema picks its decoder; nothing here
//! sniffs the alphabet at runtime.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use data_encoding::{BASE32, BASE32_NOPAD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Base16,
    Base32,
    Base64,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base16 => "base16",
            Self::Base32 => "base32",
            Self::Base64 => "base64",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not valid {encoding}")]
pub struct DecodeError {
    pub encoding: Encoding,
}

impl DecodeError {
    fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }
}

pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn decode_base64(s: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(s)
        .map_err(|_| DecodeError::new(Encoding::Base64))
}

pub fn encode_base32(data: &[u8]) -> String {
    BASE32.encode(data)
}

// Loose: case-insensitive, padding optional.
pub fn decode_base32(s: &str) -> Result<Vec<u8>, DecodeError> {
    let normalized = s.trim().trim_end_matches('=').to_ascii_uppercase();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| DecodeError::new(Encoding::Base32))
}

pub fn encode_base16(data: &[u8]) -> String {
    hex::encode(data)
}

pub fn decode_base16(s: &str) -> Result<Vec<u8>, DecodeError> {
    hex::decode(s).map_err(|_| DecodeError::new(Encoding::Base16))
}

/// Serde writers for byte fields, used with `serialize_with`.
pub mod ser {
    use serde::ser::SerializeSeq;
    use serde::Serializer;

    pub fn base64<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode_base64(bytes))
    }

    pub fn base16<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode_base16(bytes))
    }

    pub fn base64_opt<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => base64(bytes, s),
            None => s.serialize_none(),
        }
    }

    pub fn base32_opt<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => s.serialize_str(&super::encode_base32(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn base64_seq_opt<S: Serializer>(
        items: &Option<Vec<Vec<u8>>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let Some(items) = items else {
            return s.serialize_none();
        };
        let mut seq = s.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&super::encode_base64(item))?;
        }
        seq.end()
    }
}
