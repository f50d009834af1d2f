mod date_utils;
mod key_utils;

pub use date_utils::*;
pub(crate) use key_utils::*;
