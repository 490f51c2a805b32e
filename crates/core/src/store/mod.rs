//! Dual-keyed concurrent storage.
//!
//! [`DualKeyStore`] indexes every value by a synthetic identifier and by a
//! natural key at the same time. The media catalog uses it with
//! `(MediaId, PathBuf)` so an entity can be found either from an API id or
//! from a file-system event path.
//!
//! # Example
//!
//! ```ignore
//! use mediashelf_core::store::DualKeyStore;
//!
//! let store: DualKeyStore<u32, String, &str> = DualKeyStore::new();
//! let (value, added) = store.get_or_add(1, "a".to_string(), "first")?;
//! assert!(added);
//! assert_eq!(store.get_by_key(&"a".to_string()), Some("first"));
//! ```

mod dual_key;
mod error;

pub use dual_key::DualKeyStore;
pub use error::StoreError;
