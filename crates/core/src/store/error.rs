//! Error types for the store module.

use thiserror::Error;

/// Errors raised by [`super::DualKeyStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// One of the two keys is already bound to a different record.
    #[error("Key conflict: {reason}")]
    KeyConflict { reason: String },

    /// The two internal indexes disagree.
    #[error("Store indexes out of sync: {by_id} ids vs {by_key} natural keys")]
    Inconsistent { by_id: usize, by_key: usize },
}

impl StoreError {
    /// Creates a new key conflict error.
    pub fn key_conflict(reason: impl Into<String>) -> Self {
        Self::KeyConflict {
            reason: reason.into(),
        }
    }
}
