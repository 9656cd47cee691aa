/// Byte-level helpers: byte-order normalization, the working image, offsets and names
pub mod data;
/// Error definitions
pub mod error;
/// The HSF scene format: header and records, loading, and the resolved model
pub mod hsf;
/// Generic wrapper for values that may or may not match a known variant.
pub mod recognized;

pub use data::ByteOrder;
pub use error::LoadError;
pub use hsf::{LoadOptions, Model, Name, adjust_cluster_targets, load_model, load_model_with, make_canonical_name, release_model};
