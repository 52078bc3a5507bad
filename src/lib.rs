//! # shpbundle
//!
//! Locate, validate and extract Shapefile bundles from ZIP archives.
//!
//! A Shapefile is not one file but a bundle of siblings sharing a base name:
//! the `.shp` geometry, `.shx` index and `.dbf` attribute table are required,
//! sidecars such as `.prj`, `.cpg` or `.shp.xml` are optional. This crate finds
//! the bundle inside an archive, checks that it is complete and unambiguous,
//! and copies its members into a fresh, collision-free directory.
//!
//! ## Pipeline
//!
//! 1. [`open_archive`]: read the ZIP central directory, from a local path or
//!    an HTTP(S) URL fetched with Range requests
//! 2. [`resolve`]: choose the primary `.shp` entry and collect its siblings
//! 3. [`validate`]: require the `shp`, `shx` and `dbf` parts
//! 4. [`extract`]: copy every member concurrently into
//!    `<tmp>/<base name>/<random token>/`
//!
//! [`process`] runs all four. Expected rejections (empty archive, no or
//! several `.shp` files, missing parts) come back as
//! [`ValidationOutcome::Invalid`]; only open and extraction failures are errors.
//!
//! ## Example
//!
//! ```no_run
//! use shpbundle::{Options, Outcome, ValidationOutcome, process};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = Options::default().tmp_dir("/var/tmp/uploads");
//!
//!     match process("parcels.zip", &options).await? {
//!         Outcome::Extracted(path) => println!("shapefile at {}", path.display()),
//!         Outcome::Validated(ValidationOutcome::Invalid(rejection)) => {
//!             eprintln!("rejected: {}", rejection)
//!         }
//!         Outcome::Validated(ValidationOutcome::Valid(_)) => unreachable!(),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod bundle;
pub mod cli;
pub mod error;
pub mod extract;
pub mod io;
pub mod process;
pub mod zip;

pub use archive::ArchiveReader;
pub use bundle::{Part, ShapefileBundle, ValidationOutcome, resolve, validate};
pub use cli::Cli;
pub use error::{Error, ErrorKind, Rejection, Result};
pub use extract::{extract, sanitize_name};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use process::{Options, Outcome, open_archive, process, process_archive};
pub use self::zip::ZipArchive;
