//! Error types for the Parley messenger
//!
//! This module contains all error types used throughout the workspace: profile
//! storage errors, at-rest crypto errors, engine errors, and the top-level
//! `ParleyError` that unifies them.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Profile file storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no profile save found at {path}")]
    NotFound { path: String },
    #[error("a profile save already exists at {path}")]
    AlreadyExists { path: String },
    #[error("profile I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// At-rest encryption errors
///
/// `Decryption` covers both a wrong password and corrupted ciphertext; the
/// two are deliberately not distinguished so the error cannot be used as a
/// password oracle.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed")]
    Decryption,
    #[error("malformed ciphertext: {reason}")]
    Malformed { reason: &'static str },
}

/// Errors reported by the network engine, both at construction time and for
/// individual commands against a running engine.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("one of the arguments was null or empty")]
    NullArgument,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid savefile format")]
    BadSaveFormat,
    #[error("savefile is still encrypted")]
    SaveStillEncrypted,
    #[error("invalid proxy hostname {host:?}")]
    ProxyBadHost { host: String },
    #[error("invalid proxy port")]
    ProxyBadPort,
    #[error("invalid bootstrap host {host:?}")]
    BadBootstrapHost { host: String },
    #[error("invalid bootstrap port")]
    BadBootstrapPort,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("no friend with index {index}")]
    FriendNotFound { index: u32 },
    #[error("friend with key {key} already present")]
    FriendAlreadyAdded { key: String },
    #[error("cannot add own public key as a friend")]
    OwnPublicKey,
    #[error("value too long ({actual} bytes, max {max})")]
    ValueTooLong { max: usize, actual: usize },
    #[error("message is empty")]
    MessageEmpty,
}

// ----------------------------------------------------------------------------
// Top-Level Error Type
// ----------------------------------------------------------------------------

/// Unified error type for the Parley workspace
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl From<std::io::Error> for ParleyError {
    fn from(err: std::io::Error) -> Self {
        ParleyError::Storage(StorageError::Io(err))
    }
}
