//! ZIP container reader.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 records, entry metadata)
//! - [`parser`]: central directory parsing over a [`ReadAt`](crate::io::ReadAt) source
//! - [`archive`]: [`ZipArchive`], the [`ArchiveReader`](crate::ArchiveReader) implementation
//!
//! Supports ZIP64 and the STORED and DEFLATE methods. Encrypted and
//! multi-disk archives are not supported.

mod archive;
mod parser;
mod structures;

pub use archive::ZipArchive;
pub use parser::ZipParser;
pub use structures::*;
