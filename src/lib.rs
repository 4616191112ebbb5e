#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Bucket index computation for [`HashTable`].
///
/// This module provides the [`BucketHasher`] contract, an adapter from
/// `core::hash::BuildHasher`, and the default hasher selected by the crate's
/// features.
pub mod bucket_hasher;

mod error;

pub mod hash_table;

pub use bucket_hasher::BucketHasher;
pub use error::TryReserveError;
pub use hash_table::HashTable;
