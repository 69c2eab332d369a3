//! Internal utilities for the patchhost adapter.
//!
//! This crate holds the low-level helpers shared by `patchhost-core`. All
//! utilities are `const fn` where possible and have zero external dependencies.
//!
//! # Contents
//!
//! - [`fnv1a_32`] - FNV-1a hash used for plugin unique identifiers
//! - [`fnv1a_64`] - FNV-1a hash used to deduplicate incoming state blobs

pub mod hash;

pub use hash::{fnv1a_32, fnv1a_64};
