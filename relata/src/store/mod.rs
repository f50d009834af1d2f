//! Storage backends and abstractions.
//!
//! A collection never reaches into backend internals: everything it needs
//! goes through [`StorageProvider`], so the in-memory adapter shipped here can
//! be swapped for a remote or paged backend without touching the core.
//!
//! The contract:
//! - point lookup and point write
//! - batch write, applied pair by pair with per-pair results
//! - predicate-filtered scan returning a lazy [`ItemCursor`](crate::common::ItemCursor)
//! - full iteration in ascending key order
//!
//! A [`Collection`](crate::collection::Collection) implements the same trait,
//! which is how views (joins and filters) stack on top of each other.

pub mod memory;
mod storage;

pub use storage::*;
