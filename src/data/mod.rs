/// Byte-order normalization traits and the per-image visited set
pub mod endian;
/// Working copy of a file buffer that is normalized as it is read
pub mod image;
/// Offset resolution and string helpers shared by the section loaders
pub mod parser_utils;

pub use endian::ByteOrder;
