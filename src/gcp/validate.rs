// Advisory checks on a parsed GCP document.
//
// Nothing here is fatal: every problem found is returned and the caller
// decides what to do with it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::model::GcpDocument;

/// Minimum number of distinct ground positions for a georeferencing solve.
pub const MIN_GROUND_POINTS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    /// `TooFewPoints` is reported below this many distinct ground positions.
    /// Zero disables the check.
    pub min_ground_points: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            min_ground_points: MIN_GROUND_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The point references an image that is not part of the task.
    UnknownImage { line: usize, image_name: String },
    /// The same pixel of the same image already marks another point.
    DuplicateCoordinatePair {
        line: usize,
        first_line: usize,
        image_name: String,
        im_x: i64,
        im_y: i64,
    },
    TooFewPoints { found: usize, required: usize },
}

impl ValidationIssue {
    pub fn line(&self) -> Option<usize> {
        match self {
            ValidationIssue::UnknownImage { line, .. }
            | ValidationIssue::DuplicateCoordinatePair { line, .. } => Some(*line),
            ValidationIssue::TooFewPoints { .. } => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnknownImage { line, image_name } => {
                write!(f, "line {line}: image `{image_name}` is not in the image set")
            }
            ValidationIssue::DuplicateCoordinatePair {
                line,
                first_line,
                image_name,
                im_x,
                im_y,
            } => write!(
                f,
                "line {line}: pixel ({im_x}, {im_y}) of `{image_name}` is already used on line {first_line}"
            ),
            ValidationIssue::TooFewPoints { found, required } => write!(
                f,
                "only {found} distinct ground positions, at least {required} are needed"
            ),
        }
    }
}

/// Check `doc` against the images known to the task with default options.
pub fn validate(doc: &GcpDocument, known_images: &HashSet<String>) -> Vec<ValidationIssue> {
    validate_with(doc, known_images, &ValidateOptions::default())
}

pub fn validate_with(
    doc: &GcpDocument,
    known_images: &HashSet<String>,
    options: &ValidateOptions,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut first_use: HashMap<(&str, i64, i64), usize> = HashMap::new();
    let mut ground: HashSet<[u64; 3]> = HashSet::new();

    for (index, point) in doc.points.iter().enumerate() {
        let line = doc.line_of(index);

        if !known_images.contains(&point.image_name) {
            issues.push(ValidationIssue::UnknownImage {
                line,
                image_name: point.image_name.clone(),
            });
        }

        let key = (point.image_name.as_str(), point.im_x, point.im_y);
        match first_use.get(&key) {
            Some(&first_line) => issues.push(ValidationIssue::DuplicateCoordinatePair {
                line,
                first_line,
                image_name: point.image_name.clone(),
                im_x: point.im_x,
                im_y: point.im_y,
            }),
            None => {
                first_use.insert(key, line);
            }
        }

        ground.insert([
            position_bits(point.geo_x),
            position_bits(point.geo_y),
            point.geo_z.map_or(u64::MAX, position_bits),
        ]);
    }

    if ground.len() < options.min_ground_points {
        issues.push(ValidationIssue::TooFewPoints {
            found: ground.len(),
            required: options.min_ground_points,
        });
    }
    issues
}

/// Bit pattern used to compare positions; folds -0 into 0.
fn position_bits(value: f64) -> u64 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::{parse, CrsDeclaration, GroundControlPoint};

    fn images(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_document_has_no_issues() {
        let doc = parse(
            "EPSG:32610\n\
             1 1 1 10 10 a.jpg\n\
             2 2 2 10 10 b.jpg\n\
             3 3 3 20 20 a.jpg\n",
        )
        .unwrap();
        assert!(validate(&doc, &images(&["a.jpg", "b.jpg"])).is_empty());
    }

    #[test]
    fn unknown_images_are_reported_per_row() {
        let doc = parse("EPSG:4326\n1 1 1 1 1 a.jpg\n2 2 2 2 2 missing.jpg\n3 3 3 3 3 a.jpg\n").unwrap();
        assert_eq!(
            validate(&doc, &images(&["a.jpg"])),
            vec![ValidationIssue::UnknownImage {
                line: 3,
                image_name: "missing.jpg".into()
            }]
        );
    }

    #[test]
    fn same_pixel_on_same_image_is_a_duplicate() {
        let doc = parse(
            "EPSG:32610\n\
             544256.7 5320919.9 5 3044 2622 IMG_0525.jpg GCP01\n\
             # second survey\n\
             544300.1 5320950.2 6 3044 2622 IMG_0525.jpg GCP02\n\
             544310.0 5320960.0 7 3044 2622 IMG_0526.jpg GCP03\n",
        )
        .unwrap();
        let issues = validate(&doc, &images(&["IMG_0525.jpg", "IMG_0526.jpg"]));
        assert_eq!(
            issues,
            vec![ValidationIssue::DuplicateCoordinatePair {
                line: 4,
                first_line: 2,
                image_name: "IMG_0525.jpg".into(),
                im_x: 3044,
                im_y: 2622,
            }]
        );
    }

    #[test]
    fn two_points_are_too_few() {
        let doc = parse("EPSG:4326\n1 1 1 1 1 a.jpg\n2 2 2 2 2 a.jpg\n").unwrap();
        assert_eq!(
            validate(&doc, &images(&["a.jpg"])),
            vec![ValidationIssue::TooFewPoints {
                found: 2,
                required: 3
            }]
        );
    }

    #[test]
    fn repeated_ground_positions_count_once() {
        // Three rows, but one surveyed marker seen in three images.
        let doc = parse("EPSG:4326\n1 1 1 1 1 a.jpg\n1 1 1 1 1 b.jpg\n1.0 1 -0 5 5 c.jpg\n").unwrap();
        let issues = validate(&doc, &images(&["a.jpg", "b.jpg", "c.jpg"]));
        assert_eq!(
            issues,
            vec![ValidationIssue::TooFewPoints {
                found: 2,
                required: 3
            }]
        );
    }

    #[test]
    fn threshold_is_configurable() {
        let doc = GcpDocument::new(
            CrsDeclaration::wgs84(),
            vec![GroundControlPoint::new(1.0, 2.0, Some(3.0), 4, 5, "a.jpg")],
        );
        let known = images(&["a.jpg"]);
        let off = ValidateOptions { min_ground_points: 0 };
        assert!(validate_with(&doc, &known, &off).is_empty());
        let one = ValidateOptions { min_ground_points: 1 };
        assert!(validate_with(&doc, &known, &one).is_empty());
    }

    #[test]
    fn validation_does_not_touch_the_document() {
        let doc = parse("EPSG:4326\n1 1 1 1 1 a.jpg extra\n1 1 1 1 1 a.jpg\n").unwrap();
        let before = doc.clone();
        let issues = validate(&doc, &HashSet::new());
        assert_eq!(issues.len(), 4);
        assert_eq!(doc, before);
    }
}
