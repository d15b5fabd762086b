//! Static intelligence extraction from Android DEX files
//!
//! [Dex] loads a file, decodes its string pool and runs url, shell command
//! and custom signature detectors over it.

pub mod classifier;
pub mod dex;
pub mod errors;
pub mod hashes;
pub mod models;
pub mod options;
pub mod signatures;

pub use classifier::{Classification, Classifier};
pub use dex::Dex;
pub use dex_intel_dex::{DexHeader, DexVersion, ErrorKind, Inconsistency, OmittedString};
pub use errors::AnalysisError;
pub use hashes::Digests;
pub use models::{DexSnapshot, HeaderSummary};
pub use options::DexOptions;
pub use signatures::SignatureCatalog;
