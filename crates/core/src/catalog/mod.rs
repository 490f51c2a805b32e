//! Media catalog: entity registry, companion linking and persistence.
//!
//! The catalog owns every [`MediaEntity`](crate::media::MediaEntity) through a
//! [`DualKeyStore`](crate::store::DualKeyStore) keyed by id and path. When an
//! entity is inserted the catalog looks for its companion (an original and
//! its converted rendition, or two copies of the same title) and links the
//! pair symmetrically. Status changes and other edits are broadcast as
//! [`CatalogEvent`]s.

mod error;
mod events;
mod naming;
mod persist;
mod registry;

pub use error::CatalogError;
pub use events::CatalogEvent;
pub use naming::{NamingConvention, TEMP_EXTENSION};
pub use registry::MediaCatalog;
