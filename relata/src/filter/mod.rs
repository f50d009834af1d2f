//! Predicates and query trees for selecting items.
//!
//! Two predicate shapes are supported:
//! - a nested equality mapping, written with `doc!`
//! - a [`QueryNode`] tree, usually built with [`QueryBuilder`]
//!
//! # Examples
//!
//! ```rust
//! use relata::doc;
//! use relata::filter::{Predicate, QueryBuilder};
//!
//! let shallow = Predicate::from(doc! { customer: { id: 2 } });
//!
//! let query = QueryBuilder::new()
//!     .field("customer").field("id").eq(2)
//!     .field("total").gt(100)
//!     .build()
//!     .unwrap();
//!
//! let order = doc! { total: 120, customer: { id: 2 } };
//! assert!(shallow.matches(&order).unwrap());
//! assert!(query.matches(&order).unwrap());
//! ```
//!
//! # Supported Operators
//!
//! - **Equality**: `eq`, `ne`
//! - **Comparison**: `gt`, `ge`, `lt`, `le`
//! - **Extensions**: `contains`, `not_contains`, `begins_with`, `between`
//! - **Logical**: `and`, `or`, `not`

mod builder;
mod fields;
mod predicate;
mod query;

pub use builder::*;
pub use fields::*;
pub use predicate::*;
pub use query::*;
