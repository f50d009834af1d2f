pub(crate) mod stream;
mod util;
mod value;

pub use stream::*;
pub use util::*;
pub use value::*;
