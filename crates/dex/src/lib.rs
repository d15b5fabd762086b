pub mod dex;
pub mod errors;
pub mod header;
pub mod mutf8;
pub mod reader;
pub mod strings;

#[cfg(any(test, feature = "builder"))]
pub mod builder;

pub use dex::*;
pub use errors::*;
pub use header::{DexHeader, DexVersion, Inconsistency};
pub use strings::*;
