//! HSF scene files: on-disk format, loading, and the resolved model.

use bon::Builder;
use rootcause::Report;

use crate::data::ByteOrder;
use crate::error::LoadError;

pub mod cluster;
mod envelope;
pub mod format;
mod graph;
pub mod inspect;
mod loader;
mod motion;
pub mod names;
pub mod types;

#[cfg(test)]
mod testutil;

pub use cluster::adjust_cluster_targets;
pub use envelope::EnvelopeLayout;
pub use inspect::ReleaseStats;
pub use names::{Name, make_canonical_name};
pub use types::*;

/// How a file is read.
#[derive(Builder, Debug, Clone)]
pub struct LoadOptions {
    /// Byte order the file was written in.
    #[builder(default)]
    pub byte_order: ByteOrder,
    /// Reject files with more than one parentless object. When disabled the
    /// first one in section order is the root.
    #[builder(default = true)]
    pub strict_root: bool,
    /// Check the `HSFV` magic and accept only version 037. When disabled
    /// neither the magic nor the version is checked.
    #[builder(default = true)]
    pub require_magic: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::builder().build()
    }
}

/// Load a big-endian HSF file with default options.
///
/// The returned model borrows names and pixel data from `data`.
pub fn load_model(data: &[u8]) -> Result<Model<'_>, Report<LoadError>> {
    load_model_with(data, &LoadOptions::default())
}

pub fn load_model_with<'a>(data: &'a [u8], options: &LoadOptions) -> Result<Model<'a>, Report<LoadError>> {
    loader::load(data, options)
}

/// Free a model and everything it owns.
pub fn release_model(model: Model<'_>) -> ReleaseStats {
    model.release()
}
