//! # relata - collections with joins over pluggable storage
//!
//! relata is an embeddable collection library. It keeps documents in any
//! key-value [`store`] and adds relational-style joins and declarative
//! filtering on top.
//!
//! ## Key Features
//!
//! - **Storage-agnostic**: anything implementing [`store::StorageProvider`]
//!   can back a collection, including another collection
//! - **Joins**: one-to-one, one-to-many and self joins, hydrated lazily per item
//! - **Queries**: nested equality predicates or boolean/comparison trees,
//!   with conditions on joined fields checked after hydration
//! - **Views**: `filter` and `join` return new collections over the original
//!
//! ## Quick Start
//!
//! ```rust
//! use relata::collection::{CollectionOptions, JoinOptions};
//! use relata::common::Value;
//! use relata::doc;
//!
//! let customers = CollectionOptions::new().name("customer").build().unwrap();
//! let orders = CollectionOptions::new().name("order").build().unwrap();
//!
//! customers.put(doc! { id: 1, name: "Bob Jones" }).unwrap();
//! orders.put(doc! { id: 10, customer: 1, total: 25 }).unwrap();
//! orders.put(doc! { id: 11, customer: 1, total: 40 }).unwrap();
//!
//! let with_orders = customers
//!     .join(&orders, JoinOptions::new().to("customer").alias("orders"))
//!     .unwrap();
//!
//! let big_spenders = with_orders
//!     .filter(|q| q.field("orders").field("total").gt(30))
//!     .unwrap();
//! let bob = big_spenders.get(&Value::from(1)).unwrap().unwrap();
//! assert_eq!(bob.get("orders.total"), Value::Array(vec![Value::from(25), Value::from(40)]));
//! ```
//!
//! ## Design Pattern
//!
//! Collections and storages are cheap handles over shared state (`Arc`), so
//! they can be cloned freely and shared across threads. All operations are
//! synchronous; cursors are pull-based and dropping one cancels the rest of
//! the scan.
//!
//! ## Module Organization
//!
//! - [`collection`] - documents, collections, joins and key generation
//! - [`common`] - values, cursors and utilities
//! - [`errors`] - error types and result definitions
//! - [`filter`] - predicates, query trees and the query builder
//! - [`store`] - the storage contract and the in-memory adapter

pub mod collection;
pub mod common;
pub mod errors;
pub mod filter;
pub mod store;
