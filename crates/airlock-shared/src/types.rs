use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Serialize, Serializer};

use crate::constants::LOGIN_ID_SIZE;
use crate::encoding::{self, DecodeError};

// Login identity = 32 opaque bytes, base64 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoginId(pub [u8; LOGIN_ID_SIZE]);

impl LoginId {
    pub fn random() -> Self {
        let mut bytes = [0u8; LOGIN_ID_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Returns `None` unless `bytes` is exactly [`LOGIN_ID_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; LOGIN_ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn to_base64(&self) -> String {
        encoding::encode_base64(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginIdError {
    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("expected {expected} bytes, got {found}")]
    Length { expected: usize, found: usize },
}

impl FromStr for LoginId {
    type Err = LoginIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = encoding::decode_base64(s)?;
        Self::from_slice(&bytes).ok_or(LoginIdError::Length {
            expected: LOGIN_ID_SIZE,
            found: bytes.len(),
        })
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl Serialize for LoginId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_base64())
    }
}

/// Device-approval state of a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Pending,
    Approved,
    Rejected,
}

impl VoucherStatus {
    pub const ALL: &'static [&'static str] = &["pending", "approved", "rejected"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Exact match only; no case folding or fallback.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
