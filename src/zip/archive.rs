use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use flate2::Crc;
use flate2::read::DeflateDecoder;
use log::debug;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::archive::ArchiveReader;
use crate::io::{ReadAt, read_exact_at};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on the buffer reserved up front for one member, whatever
/// size the central directory claims.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// A ZIP archive whose central directory has been read.
pub struct ZipArchive<R: ReadAt + ?Sized> {
    parser: ZipParser<R>,
    entries: Vec<ZipFileEntry>,
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl<R: ReadAt + ?Sized + 'static> ZipArchive<R> {
    /// Read the central directory of `reader`.
    ///
    /// Fails if the source is not a ZIP archive or its directory is corrupt.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;

        let names: Vec<String> = entries.iter().map(|e| e.file_name.clone()).collect();
        // A repeated name resolves to its last occurrence.
        let by_name = names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        Ok(Self {
            parser,
            entries,
            names,
            by_name,
        })
    }

    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ZipFileEntry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// Decode a member into memory, verifying its CRC-32.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_directory {
            bail!("{} is a directory", entry.file_name);
        }
        if entry.is_encrypted() {
            bail!("{} is encrypted, which is not supported", entry.file_name);
        }

        let method = entry.compression_method;
        if let CompressionMethod::Unknown(code) = method {
            bail!(
                "Unsupported compression method {} for {} (only STORED and DEFLATE are supported)",
                code,
                entry.file_name
            );
        }

        let offset = self.parser.data_offset(entry).await?;
        let archive_size = self.parser.reader().size();
        match offset.checked_add(entry.compressed_size) {
            Some(end) if end <= archive_size => {}
            _ => bail!(
                "{} claims {} bytes at offset {}, past the end of the {} byte archive",
                entry.file_name,
                entry.compressed_size,
                offset,
                archive_size
            ),
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        read_exact_at(self.parser.reader().as_ref(), offset, &mut raw)
            .await
            .with_context(|| format!("Failed to read data of {}", entry.file_name))?;

        let entry = entry.clone();
        tokio::task::spawn_blocking(move || decode(&entry, method, raw)).await?
    }
}

/// Inflate (if needed) and check size and checksum against the directory.
fn decode(entry: &ZipFileEntry, method: CompressionMethod, raw: Vec<u8>) -> Result<Vec<u8>> {
    let data = match method {
        CompressionMethod::Stored => raw,
        CompressionMethod::Deflate => {
            let mut out = Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOC) as usize);
            // One byte past the declared size is enough to detect a lying header.
            DeflateDecoder::new(raw.as_slice())
                .take(entry.uncompressed_size.saturating_add(1))
                .read_to_end(&mut out)
                .with_context(|| format!("Failed to inflate {}", entry.file_name))?;
            out
        }
        CompressionMethod::Unknown(code) => bail!("Unsupported compression method {}", code),
    };

    if data.len() as u64 != entry.uncompressed_size {
        bail!(
            "{} decoded to {} bytes, expected {}",
            entry.file_name,
            data.len(),
            entry.uncompressed_size
        );
    }

    let mut crc = Crc::new();
    crc.update(&data);
    if crc.sum() != entry.crc32 {
        bail!(
            "CRC mismatch for {}: expected {:08x}, got {:08x}",
            entry.file_name,
            entry.crc32,
            crc.sum()
        );
    }

    Ok(data)
}

#[async_trait]
impl<R: ReadAt + ?Sized + 'static> ArchiveReader for ZipArchive<R> {
    fn entry_names(&self) -> &[String] {
        &self.names
    }

    async fn copy_entry(&self, name: &str, dest: &Path) -> Result<()> {
        let entry = self
            .entry(name)
            .with_context(|| format!("No entry named {} in archive", name))?;
        let data = self.read_entry(entry).await?;

        let mut file = fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!("copied {} ({} bytes) to {}", name, data.len(), dest.display());
        Ok(())
    }
}
