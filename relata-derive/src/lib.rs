#![recursion_limit = "128"]
//! # relata Derive Macros
//!
//! This crate provides procedural macros for deriving relata traits
//! automatically.
//!
//! ## Macros
//!
//! ### `Fields`
//!
//! Derives `relata::filter::Fields`, the list of dotted field paths a record
//! exposes to queries. `QueryBuilder::checked::<T>()` rejects any path that
//! is not in the list.
//!
//! - **Supported for**: Structs with named fields
//! - **Field attributes**:
//!   - `#[fields(rename = "...")]` - the field is stored under another name
//!   - `#[fields(nested)]` - the field's type (through `Option`, `Vec` and
//!     `Box`) also derives `Fields`; its paths are added under this field
//!   - `#[fields(skip)]` - the field is not queryable
//! - **Struct attribute**: `#[fields(join(alias = "...", target = Type))]`
//!   adds the paths of `Type` under a join alias
//!
//! # Examples
//!
//! ```rust,ignore
//! use relata_derive::Fields;
//!
//! #[derive(Fields)]
//! pub struct Customer {
//!     pub id: u64,
//!     pub name: String,
//! }
//!
//! #[derive(Fields)]
//! #[fields(join(alias = "customer", target = Customer))]
//! pub struct Order {
//!     pub id: u64,
//!     #[fields(rename = "customer")]
//!     pub customer_id: u64,
//! }
//! ```

extern crate proc_macro;
mod fields;

use crate::fields::generate_fields_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives the `Fields` trait for checked query building.
///
/// # Errors
///
/// Returns a compile error if:
/// - Applied to an enum, a union, a tuple struct or a unit struct
/// - An attribute is unknown or a join lacks its alias or target
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Fields)]
/// pub struct Address {
///     pub city: String,
/// }
///
/// #[derive(Fields)]
/// pub struct User {
///     pub name: String,
///     #[fields(nested)]
///     pub address: Option<Address>,
/// }
/// ```
#[proc_macro_derive(Fields, attributes(fields))]
pub fn derive_fields(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => {
            let result = generate_fields_for_struct(&ast, data);
            match result {
                Ok(token_stream) => token_stream,
                Err(e) => {
                    let error = syn::Error::new_spanned(
                        &ast,
                        format!(
                            "Failed to derive Fields for struct '{}': {}.\n\
                             Only structs with named fields are supported.\n\
                             Example: #[derive(Fields)] pub struct MyRecord {{ field: Type }}",
                            ast.ident, e
                        ),
                    );
                    error.to_compile_error().into()
                }
            }
        }
        Data::Enum(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Fields for enums. Only structs are supported.",
            );
            error.to_compile_error().into()
        }
        Data::Union(_) => {
            let error = syn::Error::new_spanned(
                &ast,
                "Cannot derive Fields for unions. Only structs are supported.",
            );
            error.to_compile_error().into()
        }
    }
}
