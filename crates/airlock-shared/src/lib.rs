//! # airlock-shared
//!
//! Types shared by every Airlock crate: login identifiers, the text
//! encodings used by persisted login documents, the encrypted-box and
//! key-derivation envelopes, and the domain error taxonomy surfaced to
//! host applications.

pub mod boxes;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod types;

pub use boxes::{EncryptedBox, Snrp};
pub use error::{CoreError, LoginFault};
pub use types::{LoginId, VoucherStatus};
