use super::{Part, ShapefileBundle, ValidationOutcome};
use crate::error::Rejection;

/// Parts without which a bundle cannot be read.
pub const REQUIRED_PARTS: [Part; 3] = [Part::Shp, Part::Dbf, Part::Shx];

/// Check that `bundle` has every required part.
///
/// Missing parts are reported sorted by their key.
pub fn validate(bundle: ShapefileBundle) -> ValidationOutcome {
    let mut missing: Vec<Part> = REQUIRED_PARTS
        .into_iter()
        .filter(|part| !bundle.contains(*part))
        .collect();

    if missing.is_empty() {
        return ValidationOutcome::Valid(bundle);
    }

    missing.sort_by_key(|part| part.as_str());
    ValidationOutcome::Invalid(Rejection::MissingParts(missing))
}
