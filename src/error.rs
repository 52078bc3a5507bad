use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::bundle::Part;

/// Stable, machine-readable classification of every failure the crate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OpenFailed,
    Empty,
    NoPrimaryFile,
    MultiplePrimaryFiles,
    RequestedNotFound,
    MissingParts,
    ExtractError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::OpenFailed => "OPEN_FAILED",
            ErrorKind::Empty => "EMPTY",
            ErrorKind::NoPrimaryFile => "NO_PRIMARY_FILE",
            ErrorKind::MultiplePrimaryFiles => "MULTIPLE_PRIMARY_FILES",
            ErrorKind::RequestedNotFound => "REQUESTED_NOT_FOUND",
            ErrorKind::MissingParts => "MISSING_PARTS",
            ErrorKind::ExtractError => "EXTRACT_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an archive does not hold a usable bundle.
///
/// These are expected outcomes returned inside
/// [`ValidationOutcome::Invalid`](crate::ValidationOutcome::Invalid), not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("ZIP file is empty")]
    Empty,

    #[error("ZIP file did not contain a shp file")]
    NoPrimaryFile,

    #[error("found multiple shapefiles: {}", join_names(.0))]
    MultiplePrimaryFiles(Vec<String>),

    #[error("requested shapefile not found: {0}")]
    RequestedNotFound(String),

    #[error("ZIP file was missing a required part{}: {}", plural(.0), join_parts(.0))]
    MissingParts(Vec<Part>),
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

fn plural(parts: &[Part]) -> &'static str {
    if parts.len() > 1 { "s" } else { "" }
}

fn join_parts(parts: &[Part]) -> String {
    parts.iter().map(Part::as_str).collect::<Vec<_>>().join(", ")
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::Empty => ErrorKind::Empty,
            Rejection::NoPrimaryFile => ErrorKind::NoPrimaryFile,
            Rejection::MultiplePrimaryFiles(_) => ErrorKind::MultiplePrimaryFiles,
            Rejection::RequestedNotFound(_) => ErrorKind::RequestedNotFound,
            Rejection::MissingParts(_) => ErrorKind::MissingParts,
        }
    }
}

/// Failures that end an operation outright.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No such file: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not open your zip: {source}")]
    Open {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error copying {entry} while unpacking: {source}")]
    Copy {
        entry: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("copy task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::Open { .. } => ErrorKind::OpenFailed,
            Error::CreateDir { .. } | Error::Copy { .. } | Error::Join(_) => {
                ErrorKind::ExtractError
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
