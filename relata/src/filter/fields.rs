/// Maps a record shape to the field paths a query may reference.
///
/// Usually derived with `#[derive(Fields)]` from `relata_derive`; a join
/// alias contributes its own path plus every path of the joined shape.
///
/// ```rust
/// use relata::filter::Fields;
///
/// struct Customer;
///
/// impl Fields for Customer {
///     fn paths() -> Vec<String> {
///         vec!["id".to_string(), "name".to_string()]
///     }
/// }
///
/// assert_eq!(Customer::paths().len(), 2);
/// ```
pub trait Fields {
    fn paths() -> Vec<String>;
}
