//! Collections, documents and joins.
//!
//! # Documents
//!
//! A [`Document`] is an ordered map from field names to [`Value`]s. Nested
//! fields are addressed with dotted paths.
//!
//! ```rust
//! use relata::collection::Document;
//! use relata::common::Value;
//!
//! let mut doc = Document::new();
//! doc.put("name", "Alice").unwrap();
//! doc.put("address.city", "New York").unwrap();
//! assert_eq!(doc.get("address.city"), Value::from("New York"));
//! ```
//!
//! # Collections
//!
//! A [`Collection`] stores documents in a [`Storage`](crate::store::Storage)
//! under their primary key and supports:
//! - point reads and writes (`get`, `set`, `put`)
//! - lazy, restartable queries (`find`, `iter`)
//! - views: `filter` restricts, `join` hydrates related items under an alias
//!
//! ```rust
//! use relata::collection::{CollectionOptions, JoinOptions};
//! use relata::filter::Predicate;
//! use relata::doc;
//!
//! let customers = CollectionOptions::new().name("customer").build().unwrap();
//! let orders = CollectionOptions::new().name("order").build().unwrap();
//! customers.put(doc! { id: 2, name: "Ann" }).unwrap();
//! orders.put(doc! { id: 10, customer: 2 }).unwrap();
//!
//! let with_customer = orders
//!     .join(&customers, JoinOptions::new().from("customer").alias("customer"))
//!     .unwrap();
//! let found = with_customer
//!     .find(&Predicate::from(doc! { customer: { name: "Ann" } }))
//!     .unwrap()
//!     .to_vec(None)
//!     .unwrap();
//! assert_eq!(found.len(), 1);
//! ```
//!
//! [`Value`]: crate::common::Value

#[allow(clippy::module_inception)]
mod collection;
mod document;
mod join;
mod keygen;
mod options;

pub use collection::*;
pub use document::*;
pub use join::*;
pub use keygen::*;
pub use options::*;
