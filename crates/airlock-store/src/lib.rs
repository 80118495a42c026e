//! # airlock-store
//!
//! Validation and persistence of login stashes.
//!
//! Untrusted JSON (from the login server or from disk) is turned into typed
//! [`LoginRecord`] trees by the cleaners in [`cleaners`] and [`models`].
//! Persistence goes through the [`Disk`] capability, which the host injects;
//! [`SqliteDisk`] and [`MemoryDisk`] are the two implementations shipped here.

pub mod cleaners;
pub mod database;
pub mod disk;
pub mod files;
pub mod migrations;
pub mod models;
pub mod stash;
pub mod tree;

mod error;

pub use cleaners::{FieldPath, ValidationError, ValidationErrorKind};
pub use database::Database;
pub use disk::{Disk, MemoryDisk, SqliteDisk};
pub use error::{Result, StoreError};
pub use models::*;
pub use stash::StashLoader;
