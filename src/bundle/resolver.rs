use std::collections::BTreeMap;

use log::debug;

use super::{Part, ShapefileBundle, ValidationOutcome};
use crate::error::Rejection;

/// Entries under this resource-fork directory (added by macOS Finder) are never candidates.
pub const JUNK_DIR_MARKER: &str = "__MACOSX";

const COMPOUND_SUFFIX: &str = ".shp.xml";

/// Split an archive entry name into its directory and final segment.
///
/// Archive names always use `/`; the directory of a top-level entry is `""`.
/// A trailing slash (directory entry) is ignored.
pub fn split_entry_name(name: &str) -> (&str, &str) {
    let trimmed = name.trim_end_matches('/');
    trimmed.rsplit_once('/').unwrap_or(("", trimmed))
}

/// Directory, base name and extension key of one archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryParts<'a> {
    pub dir: &'a str,
    pub base: &'a str,
    pub extension: &'a str,
}

/// Break `name` into the pieces bundle matching compares.
///
/// `.shp.xml` is taken as one compound extension, so `roads.shp.xml` has
/// base `roads`. Returns `None` for names without an extension, including
/// dot-files such as `.shp`.
pub fn entry_parts(name: &str) -> Option<EntryParts<'_>> {
    let (dir, file) = split_entry_name(name);

    let split_at = match file.len().checked_sub(COMPOUND_SUFFIX.len()) {
        Some(at)
            if at > 0
                && file
                    .get(at..)
                    .is_some_and(|tail| tail.eq_ignore_ascii_case(COMPOUND_SUFFIX)) =>
        {
            at
        }
        _ => file.rfind('.').filter(|&at| at > 0)?,
    };

    Some(EntryParts {
        dir,
        base: &file[..split_at],
        extension: &file[split_at + 1..],
    })
}

/// Entries that could anchor a bundle: `.shp` in any case, outside junk directories.
pub fn candidates<S: AsRef<str>>(names: &[S]) -> Vec<&str> {
    names
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|name| !name.contains(JUNK_DIR_MARKER))
        .filter(|name| {
            let (_, file) = split_entry_name(name);
            file.rfind('.')
                .filter(|&at| at > 0)
                .is_some_and(|at| file[at + 1..].eq_ignore_ascii_case(Part::Shp.as_str()))
        })
        .collect()
}

/// Pick the primary entry among `names` and gather its siblings.
///
/// `selected` only matters when there is more than one candidate; it must
/// then name one of them exactly. The returned bundle is not checked for
/// required parts, see [`validate`](super::validate).
pub fn resolve<S: AsRef<str>>(names: &[S], selected: Option<&str>) -> ValidationOutcome {
    if names.is_empty() {
        return Rejection::Empty.into();
    }

    let found = candidates(names);
    debug!("found {} shp candidate(s): {:?}", found.len(), found);

    let primary = match (found.as_slice(), selected) {
        ([], _) => return Rejection::NoPrimaryFile.into(),
        ([only], _) => *only,
        (_, Some(wanted)) => match found.iter().find(|name| **name == wanted) {
            Some(name) => *name,
            None => return Rejection::RequestedNotFound(wanted.to_string()).into(),
        },
        (_, None) => {
            return Rejection::MultiplePrimaryFiles(
                found.iter().map(|name| name.to_string()).collect(),
            )
            .into();
        }
    };

    // A `.shp` candidate always has an extension, so this cannot miss.
    let Some(anchor) = entry_parts(primary) else {
        return Rejection::NoPrimaryFile.into();
    };

    debug!(
        "selected {} (dir {:?}, base {:?})",
        primary, anchor.dir, anchor.base
    );

    let mut members = BTreeMap::new();
    for name in names.iter().map(AsRef::<str>::as_ref) {
        let Some(parts) = entry_parts(name) else {
            continue;
        };
        if parts.dir != anchor.dir || parts.base != anchor.base {
            continue;
        }
        let Some(part) = Part::from_extension(parts.extension) else {
            continue;
        };
        // Later entries replace earlier ones with the same key.
        if let Some(previous) = members.insert(part, name.to_string()) {
            debug!("{} replaces {} as the {} member", name, previous, part);
        }
    }

    ValidationOutcome::Valid(ShapefileBundle::new(
        primary.to_string(),
        anchor.dir.to_string(),
        anchor.base.to_string(),
        members,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(outcome: &ValidationOutcome) -> Vec<&'static str> {
        outcome
            .bundle()
            .expect("bundle should resolve")
            .members()
            .map(|(part, _)| part.as_str())
            .collect()
    }

    #[test]
    fn splits_directory_from_file() {
        assert_eq!(split_entry_name("data/parcels.shp"), ("data", "parcels.shp"));
        assert_eq!(split_entry_name("a/b/c.dbf"), ("a/b", "c.dbf"));
        assert_eq!(split_entry_name("top.shx"), ("", "top.shx"));
        assert_eq!(split_entry_name("data/"), ("", "data"));
    }

    #[test]
    fn metadata_sidecar_uses_compound_extension() {
        let parts = entry_parts("data/roads.shp.xml").unwrap();
        assert_eq!(parts.dir, "data");
        assert_eq!(parts.base, "roads");
        assert_eq!(parts.extension, "shp.xml");

        let parts = entry_parts("roads.SHP.XML").unwrap();
        assert_eq!(parts.base, "roads");
        assert_eq!(parts.extension, "SHP.XML");

        // A bare .xml keeps its own base and so never matches a bundle.
        let parts = entry_parts("roads.xml").unwrap();
        assert_eq!(parts.base, "roads");
        assert_eq!(parts.extension, "xml");
    }

    #[test]
    fn names_without_extension_have_no_parts() {
        assert_eq!(entry_parts("README"), None);
        assert_eq!(entry_parts("data/.shp"), None);
        assert_eq!(entry_parts("data/"), None);
    }

    #[test]
    fn empty_archive_is_rejected() {
        let names: [&str; 0] = [];
        assert_eq!(
            resolve(&names, None),
            ValidationOutcome::Invalid(Rejection::Empty)
        );
    }

    #[test]
    fn archive_without_shp_is_rejected() {
        let outcome = resolve(&["a.dbf", "a.shx", "notes.txt"], None);
        assert_eq!(outcome, ValidationOutcome::Invalid(Rejection::NoPrimaryFile));
    }

    #[test]
    fn macos_junk_is_not_a_candidate() {
        let names = [
            "parcels.shp",
            "parcels.dbf",
            "parcels.shx",
            "__MACOSX/._parcels.shp",
        ];
        let outcome = resolve(&names, None);
        assert_eq!(outcome.bundle().unwrap().primary(), "parcels.shp");
        assert_eq!(candidates(&names), ["parcels.shp"]);
    }

    #[test]
    fn multiple_candidates_need_a_selection() {
        let names = ["roads.shp", "roads.dbf", "rivers/rivers.shp", "rivers/rivers.dbf"];
        assert_eq!(
            resolve(&names, None),
            ValidationOutcome::Invalid(Rejection::MultiplePrimaryFiles(vec![
                "roads.shp".to_string(),
                "rivers/rivers.shp".to_string(),
            ]))
        );
    }

    #[test]
    fn selection_picks_the_named_candidate() {
        let names = ["roads.shp", "roads.dbf", "rivers/rivers.shp", "rivers/rivers.dbf"];
        let outcome = resolve(&names, Some("rivers/rivers.shp"));
        let bundle = outcome.bundle().unwrap();
        assert_eq!(bundle.dir(), "rivers");
        assert_eq!(bundle.base_name(), "rivers");
        assert_eq!(bundle.get(Part::Dbf), Some("rivers/rivers.dbf"));
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn selection_must_match_exactly() {
        let names = ["roads.shp", "rivers/rivers.shp"];
        assert_eq!(
            resolve(&names, Some("rivers.shp")),
            ValidationOutcome::Invalid(Rejection::RequestedNotFound("rivers.shp".to_string()))
        );
    }

    #[test]
    fn selection_is_ignored_for_a_single_candidate() {
        let outcome = resolve(&["roads.shp", "roads.dbf"], Some("other.shp"));
        assert_eq!(outcome.bundle().unwrap().primary(), "roads.shp");
    }

    #[test]
    fn base_name_match_is_case_sensitive() {
        let names = [
            "data/parcels.shp",
            "data/parcels.dbf",
            "data/parcels.shx",
            "data/Parcels.prj",
        ];
        let outcome = resolve(&names, None);
        assert_eq!(keys(&outcome), ["shp", "shx", "dbf"]);
        assert!(!outcome.bundle().unwrap().contains(Part::Prj));
    }

    #[test]
    fn extension_match_ignores_case() {
        let names = [
            "data/parcels.SHP",
            "data/parcels.Dbf",
            "data/parcels.SHX",
            "data/parcels.shp.XML",
        ];
        let outcome = resolve(&names, None);
        let bundle = outcome.bundle().unwrap();
        assert_eq!(bundle.base_name(), "parcels");
        assert_eq!(bundle.get(Part::Dbf), Some("data/parcels.Dbf"));
        assert_eq!(bundle.get(Part::ShpXml), Some("data/parcels.shp.XML"));
    }

    #[test]
    fn siblings_in_other_directories_are_excluded() {
        let names = ["a/parcels.shp", "a/parcels.dbf", "b/parcels.shx", "parcels.prj"];
        let outcome = resolve(&names, None);
        assert_eq!(keys(&outcome), ["shp", "dbf"]);
    }

    #[test]
    fn unrecognised_extensions_are_skipped() {
        let names = ["x.shp", "x.dbf", "x.shx", "x.txt", "x.xml", "x.cpg", "x.qix"];
        let outcome = resolve(&names, None);
        assert_eq!(keys(&outcome), ["shp", "shx", "dbf", "cpg", "qix"]);
    }

    #[test]
    fn later_entry_wins_a_duplicate_key() {
        let names = ["x.shp", "x.dbf", "x.DBF"];
        let outcome = resolve(&names, None);
        assert_eq!(outcome.bundle().unwrap().get(Part::Dbf), Some("x.DBF"));
    }

    #[test]
    fn resolution_does_not_check_required_parts() {
        let outcome = resolve(&["lonely.shp"], None);
        assert_eq!(keys(&outcome), ["shp"]);
    }
}
