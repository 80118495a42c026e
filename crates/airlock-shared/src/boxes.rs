//! Opaque envelopes carried by login records.
//!
//! An [`EncryptedBox`] holds ciphertext produced elsewhere; an [`Snrp`] holds
//! the key-derivation parameters that turn a password into a key. Neither
//! type encrypts, decrypts, or derives anything: the login tree only needs to
//! validate and carry them.

use serde::Serialize;

use crate::encoding::ser;

/// Ciphertext envelope.
///
/// JSON shape: `{"encryptionType": 0, "iv_hex": "...", "data_base64": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedBox {
    #[serde(rename = "encryptionType")]
    pub encryption_type: u64,
    #[serde(rename = "iv_hex", serialize_with = "ser::base16")]
    pub iv: Vec<u8>,
    #[serde(rename = "data_base64", serialize_with = "ser::base64")]
    pub data: Vec<u8>,
}

impl EncryptedBox {
    pub fn new(encryption_type: u64, iv: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            encryption_type,
            iv,
            data,
        }
    }
}

/// Scrypt-style key-derivation parameters.
///
/// JSON shape: `{"salt_hex": "...", "n": 16384, "r": 8, "p": 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snrp {
    #[serde(rename = "salt_hex", serialize_with = "ser::base16")]
    pub salt: Vec<u8>,
    pub n: u64,
    pub r: u64,
    pub p: u64,
}
