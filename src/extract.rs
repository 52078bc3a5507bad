//! Copying a resolved bundle out of its archive.
//!
//! Every extraction gets its own directory,
//! `<output root>/<base name>/<random token>`, created before any member is
//! copied. Members are then copied concurrently, one task each. A failed copy
//! does not stop its siblings, and nothing already written is removed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::RngCore;
use tokio::fs;
use tokio::task::JoinSet;

use crate::archive::ArchiveReader;
use crate::bundle::{ShapefileBundle, split_entry_name};
use crate::error::{Error, Result};

/// Random bytes in a directory token (96 bits).
const TOKEN_BYTES: usize = 12;

/// Output file name for an archive entry.
///
/// Keeps only the final path segment, so directory components and traversal
/// sequences in hostile entry names are dropped. Spaces and backslashes
/// become underscores and the result is lowercased. A segment of only dots
/// is replaced by underscores. Applying it twice changes nothing.
pub fn sanitize_name(entry_name: &str) -> String {
    let (_, file) = split_entry_name(entry_name);
    let cleaned: String = file
        .chars()
        .map(|c| match c {
            ' ' | '\\' => '_',
            c => c,
        })
        .collect::<String>()
        .to_lowercase();
    neutralize_dots(cleaned)
}

fn neutralize_dots(segment: String) -> String {
    if segment.chars().all(|c| c == '.') {
        "_".repeat(segment.len().max(1))
    } else {
        segment
    }
}

fn random_token() -> String {
    let mut token = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut token);
    hex::encode(token)
}

/// A fresh, absolute destination directory for `bundle` under `output_root`.
///
/// The base name keeps its case and spaces but must stay a single segment
/// on every platform, so backslashes become underscores.
pub fn destination_dir(output_root: &Path, bundle: &ShapefileBundle) -> Result<PathBuf> {
    let base = bundle.base_name().replace('\\', "_");
    let dir = output_root
        .join(neutralize_dots(base))
        .join(random_token());
    std::path::absolute(&dir).map_err(|source| Error::CreateDir { path: dir, source })
}

/// Copy every member of `bundle` into a new directory under `output_root`.
///
/// Returns the path of the extracted primary file. All copy tasks are
/// awaited before returning; the first failure observed is reported.
pub async fn extract<A>(
    archive: Arc<A>,
    bundle: &ShapefileBundle,
    output_root: &Path,
) -> Result<PathBuf>
where
    A: ArchiveReader + ?Sized + 'static,
{
    let dir = destination_dir(output_root, bundle)?;
    fs::create_dir_all(&dir)
        .await
        .map_err(|source| Error::CreateDir {
            path: dir.clone(),
            source,
        })?;

    info!(
        "extracting {} member(s) of {} into {}",
        bundle.len(),
        bundle.primary(),
        dir.display()
    );

    let mut tasks = JoinSet::new();
    for (part, name) in bundle.members() {
        let archive = Arc::clone(&archive);
        let name = name.to_string();
        let dest = dir.join(sanitize_name(&name));
        debug!("queue {} member {} -> {}", part, name, dest.display());

        tasks.spawn(async move {
            let result = archive.copy_entry(&name, &dest).await;
            (name, result)
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let error = match joined {
            Ok((_, Ok(()))) => continue,
            Ok((entry, Err(source))) => {
                warn!("failed to copy {}: {:#}", entry, source);
                Error::Copy { entry, source }
            }
            Err(join_error) => {
                warn!("copy task did not complete: {}", join_error);
                Error::Join(join_error)
            }
        };
        if first_error.is_none() {
            first_error = Some(error);
        }
    }

    if let Some(error) = first_error {
        return Err(error);
    }

    let primary = dir.join(sanitize_name(bundle.primary()));
    info!("extracted {}", primary.display());
    Ok(primary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{ValidationOutcome, resolve, validate};
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashMap};

    /// In-memory archive; entries listed in `broken` fail to copy.
    struct MemoryArchive {
        names: Vec<String>,
        data: HashMap<String, Vec<u8>>,
        broken: Vec<String>,
    }

    impl MemoryArchive {
        fn new(entries: &[&str]) -> Self {
            Self {
                names: entries.iter().map(|name| name.to_string()).collect(),
                data: entries
                    .iter()
                    .map(|name| (name.to_string(), name.as_bytes().to_vec()))
                    .collect(),
                broken: Vec::new(),
            }
        }

        fn breaking(mut self, name: &str) -> Self {
            self.broken.push(name.to_string());
            self
        }

        fn bundle(&self) -> ShapefileBundle {
            match resolve(&self.names, None).and_then(validate) {
                ValidationOutcome::Valid(bundle) => bundle,
                ValidationOutcome::Invalid(rejection) => {
                    panic!("unexpected rejection: {rejection}")
                }
            }
        }
    }

    #[async_trait]
    impl ArchiveReader for MemoryArchive {
        fn entry_names(&self) -> &[String] {
            &self.names
        }

        async fn copy_entry(&self, name: &str, dest: &Path) -> anyhow::Result<()> {
            let parent = dest.parent().expect("destination has a parent");
            anyhow::ensure!(parent.is_dir(), "{} does not exist yet", parent.display());
            if self.broken.iter().any(|broken| broken == name) {
                anyhow::bail!("simulated read failure");
            }
            let data = self
                .data
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("no entry {}", name))?;
            std::fs::write(dest, data)?;
            Ok(())
        }
    }

    fn listing(dir: &Path) -> BTreeSet<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn sanitize_keeps_only_the_last_segment() {
        assert_eq!(sanitize_name("data/Parcels.SHP"), "parcels.shp");
        assert_eq!(sanitize_name("a/b/c/My Roads.dbf"), "my_roads.dbf");
        assert_eq!(sanitize_name("../../etc/passwd.shp"), "passwd.shp");
        assert_eq!(sanitize_name("..\\..\\evil.shp"), ".._.._evil.shp");
        assert_eq!(sanitize_name("dir/.."), "__");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in [
            "Data Set/Big File.SHP",
            "..\\windows\\style.dbf",
            "../../escape.shx",
            "plain.prj",
            "x/../..",
        ] {
            let once = sanitize_name(name);
            assert_eq!(sanitize_name(&once), once, "for {name}");
        }
    }

    #[test]
    fn destination_is_keyed_by_base_name() {
        let archive = MemoryArchive::new(&["d/roads.shp", "d/roads.dbf", "d/roads.shx"]);
        let root = Path::new("/srv/out");
        let dir = destination_dir(root, &archive.bundle()).unwrap();

        assert_eq!(dir.parent().unwrap(), Path::new("/srv/out/roads"));
        let token = dir.file_name().unwrap().to_str().unwrap();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn destination_base_cannot_climb_with_backslashes() {
        let archive = MemoryArchive::new(&["..\\..\\x.shp", "..\\..\\x.dbf", "..\\..\\x.shx"]);
        let bundle = archive.bundle();
        assert_eq!(bundle.base_name(), "..\\..\\x");

        let root = Path::new("/srv/out");
        let dir = destination_dir(root, &bundle).unwrap();
        assert_eq!(dir.parent().unwrap(), Path::new("/srv/out/.._.._x"));
    }

    #[test]
    fn dot_only_base_stays_inside_the_root() {
        let archive = MemoryArchive::new(&["...shp", "...dbf", "...shx"]);
        let bundle = archive.bundle();
        assert_eq!(bundle.base_name(), "..");

        let dir = destination_dir(Path::new("/srv/out"), &bundle).unwrap();
        assert_eq!(dir.parent().unwrap(), Path::new("/srv/out/__"));
    }

    #[tokio::test]
    async fn extracts_every_member_under_its_sanitized_name() {
        let root = tempfile::tempdir().unwrap();
        let archive = MemoryArchive::new(&[
            "Export/Land Use.shp",
            "Export/Land Use.DBF",
            "Export/Land Use.shx",
            "Export/Land Use.prj",
            "Export/Land Use.shp.xml",
            "Export/readme.txt",
        ]);
        let bundle = archive.bundle();

        let primary = extract(Arc::new(archive), &bundle, root.path()).await.unwrap();

        let dir = primary.parent().unwrap();
        assert!(dir.starts_with(root.path().join("Land Use")));
        assert_eq!(primary, dir.join("land_use.shp"));
        assert_eq!(
            listing(dir),
            BTreeSet::from([
                "land_use.dbf".to_string(),
                "land_use.prj".to_string(),
                "land_use.shp".to_string(),
                "land_use.shp.xml".to_string(),
                "land_use.shx".to_string(),
            ])
        );
        assert_eq!(
            std::fs::read(dir.join("land_use.dbf")).unwrap(),
            b"Export/Land Use.DBF"
        );
    }

    #[tokio::test]
    async fn concurrent_extractions_use_separate_directories() {
        let root = tempfile::tempdir().unwrap();
        let archive = Arc::new(MemoryArchive::new(&["p.shp", "p.dbf", "p.shx"]));
        let bundle = archive.bundle();

        let (first, second) = tokio::join!(
            extract(Arc::clone(&archive), &bundle, root.path()),
            extract(Arc::clone(&archive), &bundle, root.path()),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_ne!(first.parent(), second.parent());
        assert_eq!(listing(first.parent().unwrap()).len(), 3);
        assert_eq!(listing(second.parent().unwrap()).len(), 3);
    }

    #[tokio::test]
    async fn failed_copy_is_reported_and_siblings_are_kept() {
        let root = tempfile::tempdir().unwrap();
        let archive = MemoryArchive::new(&["p.shp", "p.dbf", "p.shx"]).breaking("p.dbf");
        let bundle = archive.bundle();

        let err = extract(Arc::new(archive), &bundle, root.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractError);
        assert!(matches!(&err, Error::Copy { entry, .. } if entry == "p.dbf"));

        let token_dirs: Vec<_> = std::fs::read_dir(root.path().join("p"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(token_dirs.len(), 1);
        assert_eq!(
            listing(&token_dirs[0]),
            BTreeSet::from(["p.shp".to_string(), "p.shx".to_string()])
        );
    }

    #[tokio::test]
    async fn uncreatable_output_root_is_an_extract_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let archive = MemoryArchive::new(&["p.shp", "p.dbf", "p.shx"]);
        let bundle = archive.bundle();
        let err = extract(Arc::new(archive), &bundle, &blocker)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CreateDir { .. }));
        assert_eq!(err.kind(), ErrorKind::ExtractError);
    }
}
