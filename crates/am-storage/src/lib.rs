//! Durable key-value storage for the asset manager.
//!
//! A [`Store`] holds string values under string keys, either in a JSON file
//! or in memory. Typed access goes through [`StoredValue`], which decodes
//! with a [`Codec`], falls back to a default on unreadable data, and follows
//! changes made through other handles on the same store.
//!
//! Collection helpers: [`StoredList`], [`RecentItems`], [`Preferences`].
//! Well-known keys live in [`keys`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod collections;
pub mod error;
pub mod keys;
pub mod store;
pub mod value;

pub use collections::{DEFAULT_RECENT_ITEMS, Preferences, RecentItems, StoredList};
pub use error::StorageError;
pub use keys::Theme;
pub use store::{Origin, StorageEvent, Store};
pub use value::{Codec, JsonCodec, StoredValue, TextCodec, ValidatedCodec};
