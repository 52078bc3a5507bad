//! Shapefile bundles: the sibling entries that make up one data product.
//!
//! Resolution ([`resolve`]) picks the primary `.shp` entry and gathers its
//! siblings; validation ([`validate`]) checks that the required parts are
//! there. The two are separate so an incomplete bundle can still be inspected.

mod resolver;
mod validator;

pub use resolver::{
    EntryParts, JUNK_DIR_MARKER, candidates, entry_parts, resolve, split_entry_name,
};
pub use validator::{REQUIRED_PARTS, validate};

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Rejection;

/// The recognised member extensions of a Shapefile bundle.
///
/// Ordering follows declaration order, which keeps the required parts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Part {
    /// Geometry, the primary file.
    Shp,
    /// Shape index.
    Shx,
    /// Attribute table.
    Dbf,
    /// Projection.
    Prj,
    Sbn,
    Sbx,
    Fbn,
    Fbx,
    Ain,
    Aih,
    Ixs,
    Mxs,
    Atx,
    /// Metadata sidecar, always the compound suffix `.shp.xml`.
    ShpXml,
    /// Code page.
    Cpg,
    Qix,
    Index,
}

impl Part {
    pub const ALL: [Part; 17] = [
        Part::Shp,
        Part::Shx,
        Part::Dbf,
        Part::Prj,
        Part::Sbn,
        Part::Sbx,
        Part::Fbn,
        Part::Fbx,
        Part::Ain,
        Part::Aih,
        Part::Ixs,
        Part::Mxs,
        Part::Atx,
        Part::ShpXml,
        Part::Cpg,
        Part::Qix,
        Part::Index,
    ];

    /// The key as written after the base name, without the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Shp => "shp",
            Part::Shx => "shx",
            Part::Dbf => "dbf",
            Part::Prj => "prj",
            Part::Sbn => "sbn",
            Part::Sbx => "sbx",
            Part::Fbn => "fbn",
            Part::Fbx => "fbx",
            Part::Ain => "ain",
            Part::Aih => "aih",
            Part::Ixs => "ixs",
            Part::Mxs => "mxs",
            Part::Atx => "atx",
            Part::ShpXml => "shp.xml",
            Part::Cpg => "cpg",
            Part::Qix => "qix",
            Part::Index => "index",
        }
    }

    /// Look up an extension key, ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Part> {
        Part::ALL
            .into_iter()
            .find(|part| part.as_str().eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved bundle: the primary entry's location plus every recognised
/// sibling, keyed by part.
///
/// Every member shares `dir` and `base` with the primary entry, and the
/// primary entry is always the [`Part::Shp`] member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileBundle {
    primary: String,
    dir: String,
    base: String,
    members: BTreeMap<Part, String>,
}

impl ShapefileBundle {
    pub(crate) fn new(
        primary: String,
        dir: String,
        base: String,
        members: BTreeMap<Part, String>,
    ) -> Self {
        Self {
            primary,
            dir,
            base,
            members,
        }
    }

    /// Entry name of the selected geometry file.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Directory of the primary entry inside the archive, `""` at the root.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// File name of the primary entry with its extension removed.
    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn get(&self, part: Part) -> Option<&str> {
        self.members.get(&part).map(String::as_str)
    }

    pub fn contains(&self, part: Part) -> bool {
        self.members.contains_key(&part)
    }

    pub fn members(&self) -> impl Iterator<Item = (Part, &str)> {
        self.members.iter().map(|(part, name)| (*part, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of resolving or validating a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(ShapefileBundle),
    Invalid(Rejection),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn bundle(&self) -> Option<&ShapefileBundle> {
        match self {
            ValidationOutcome::Valid(bundle) => Some(bundle),
            ValidationOutcome::Invalid(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid(rejection) => Some(rejection),
        }
    }

    /// Chain a further check onto a valid outcome.
    pub fn and_then(self, f: impl FnOnce(ShapefileBundle) -> ValidationOutcome) -> Self {
        match self {
            ValidationOutcome::Valid(bundle) => f(bundle),
            invalid => invalid,
        }
    }
}

impl From<Rejection> for ValidationOutcome {
    fn from(rejection: Rejection) -> Self {
        ValidationOutcome::Invalid(rejection)
    }
}
