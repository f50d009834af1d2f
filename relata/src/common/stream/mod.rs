mod item_cursor;
pub(crate) mod filtered_stream;
pub(crate) mod joined_cursor;

pub use item_cursor::*;
