//! The container capability the bundle logic is written against.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// An opened archive: a fixed list of entry names plus the ability to copy
/// any one of them out to a file.
///
/// Implementations must allow concurrent `copy_entry` calls for distinct
/// destinations.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// Entry names in archive enumeration order.
    fn entry_names(&self) -> &[String];

    /// Write the decoded bytes of entry `name` to `dest`, creating or
    /// truncating the file. The parent directory must already exist.
    async fn copy_entry(&self, name: &str, dest: &Path) -> Result<()>;
}
