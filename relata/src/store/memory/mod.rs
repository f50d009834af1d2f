mod config;
mod map;

pub use config::*;
pub use map::*;
