//! Database access

mod pool;

pub use pool::*;
