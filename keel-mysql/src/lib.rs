mod catalog;
mod dialect;

pub use catalog::*;
pub use dialect::*;
