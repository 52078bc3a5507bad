//! The single entry point: open, resolve, validate, then optionally extract.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::archive::ArchiveReader;
use crate::bundle::{ValidationOutcome, resolve, validate};
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::io::{HttpRangeReader, LocalFileReader};
use crate::zip::ZipArchive;

/// How [`process`] should treat an archive.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root for extraction directories; the system temp directory when unset.
    pub tmp_dir: Option<PathBuf>,
    /// Copy the bundle out after validating it.
    pub extract: bool,
    /// Which `.shp` entry to use when the archive holds several.
    pub primary_file_name: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tmp_dir: None,
            extract: true,
            primary_file_name: None,
        }
    }
}

impl Options {
    pub fn tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    pub fn extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }

    pub fn primary_file_name(mut self, name: impl Into<String>) -> Self {
        self.primary_file_name = Some(name.into());
        self
    }

    /// Directory extraction directories are created under.
    pub fn output_root(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// What [`process`] produced for a readable archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Validation result, returned when extraction was disabled or the
    /// archive was rejected.
    Validated(ValidationOutcome),
    /// Absolute path of the extracted primary file.
    Extracted(PathBuf),
}

impl Outcome {
    pub fn extracted_path(&self) -> Option<&Path> {
        match self {
            Outcome::Extracted(path) => Some(path),
            Outcome::Validated(_) => None,
        }
    }
}

fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Open a local path or HTTP(S) URL as a ZIP archive.
pub async fn open_archive(location: &str) -> Result<Arc<dyn ArchiveReader>> {
    if is_http_url(location) {
        let reader = HttpRangeReader::new(location.to_string())
            .await
            .map_err(|source| Error::Open {
                path: location.to_string(),
                source,
            })?;
        let archive = open_zip(location, Arc::new(reader)).await?;
        return Ok(Arc::new(archive));
    }

    let path = std::path::absolute(location).map_err(|e| Error::Open {
        path: location.to_string(),
        source: e.into(),
    })?;
    if !path.exists() {
        return Err(Error::NotFound(path));
    }

    let reader = LocalFileReader::new(&path).map_err(|source| Error::Open {
        path: location.to_string(),
        source,
    })?;
    let archive = open_zip(location, Arc::new(reader)).await?;
    Ok(Arc::new(archive))
}

async fn open_zip<R>(location: &str, reader: Arc<R>) -> Result<ZipArchive<R>>
where
    R: crate::io::ReadAt + 'static,
{
    let archive = ZipArchive::open(reader).await.map_err(|source| Error::Open {
        path: location.to_string(),
        source,
    })?;
    debug!("{} has {} entries", location, archive.entries().len());
    Ok(archive)
}

/// Resolve and validate the bundle in an already opened archive.
pub fn inspect<A: ArchiveReader + ?Sized>(
    archive: &A,
    selected: Option<&str>,
) -> ValidationOutcome {
    resolve(archive.entry_names(), selected).and_then(validate)
}

/// Run the whole pipeline on an opened archive.
pub async fn process_archive<A>(archive: Arc<A>, options: &Options) -> Result<Outcome>
where
    A: ArchiveReader + ?Sized + 'static,
{
    let outcome = inspect(archive.as_ref(), options.primary_file_name.as_deref());

    let bundle = match outcome {
        ValidationOutcome::Valid(bundle) if options.extract => bundle,
        other => {
            if let Some(rejection) = other.rejection() {
                info!("archive rejected ({}): {}", rejection.kind(), rejection);
            }
            return Ok(Outcome::Validated(other));
        }
    };

    let primary = extract(archive, &bundle, &options.output_root()).await?;
    Ok(Outcome::Extracted(primary))
}

/// Open `location` and run the pipeline on it.
///
/// Returns an error only when the archive cannot be opened or extraction
/// fails; a rejected archive is an [`Outcome::Validated`] holding
/// [`ValidationOutcome::Invalid`].
pub async fn process(location: &str, options: &Options) -> Result<Outcome> {
    let archive = open_archive(location).await?;
    process_archive(archive, options).await
}
