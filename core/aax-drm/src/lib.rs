//! DRM key derivation, activation validation, and sample decryption for
//! Audible AAX containers.
//!
//! All hashing is SHA-1; all symmetric crypto is AES-128-CBC with padding
//! disabled. `validate` is the one function in this crate that deliberately
//! returns a `bool` rather than a `Result`, because it is consulted
//! speculatively against structurally-untrusted `adrm` bytes.

pub mod decrypt;
pub mod error;
pub mod keys;

pub use decrypt::decrypt_sample;
pub use error::{DrmError, Result};
pub use keys::{derive_keys, validate, FileKeys};
