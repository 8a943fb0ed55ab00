// Editing session for a GCP table.
//
// The session owns the in-progress list of points and the file it was
// loaded from. Front-ends hold one of these instead of keeping GCP state
// in globals, and hand it to parse/serialize/validate when needed.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::crs::CrsDeclaration;
use super::error::{GcpError, SessionError};
use super::model::{GcpDocument, GroundControlPoint, RowFormat};
use super::parser::{parse_with, ParseOptions};
use super::serializer::{serialize_with, Delimiter, SerializeOptions};
use super::validate::{validate_with, ValidateOptions, ValidationIssue};

const GENERATOR_LINES: [&str; 2] = [
    "GCP file generated by ODM Frontend",
    "Compatible with OpenDroneMap/WebODM",
];

/// Line of the first data row in a saved file: CRS, generator lines, format line.
const FIRST_ROW_LINE: usize = GENERATOR_LINES.len() + 3;

fn file_header(format: RowFormat) -> Vec<String> {
    let layout = match format {
        RowFormat::Standard => "Format: geo_x geo_y geo_z im_x im_y filename [gcp_name]",
        RowFormat::NoElevation => "Format: geo_x geo_y im_x im_y filename [gcp_name]",
    };
    let mut lines: Vec<String> = GENERATOR_LINES.iter().map(|s| s.to_string()).collect();
    lines.push(layout.to_string());
    lines
}

/// Reject values the whitespace-separated row format cannot hold.
pub fn check_field(field: &'static str, value: &str) -> Result<(), SessionError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(SessionError::UnstorableField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_point(point: &GroundControlPoint) -> Result<(), SessionError> {
    check_field("image name", &point.image_name)?;
    if let Some(name) = &point.gcp_name {
        check_field("GCP name", name)?;
    }
    point.extras.iter().try_for_each(|extra| check_field("extra field", extra))
}

#[derive(Debug, Clone)]
pub struct GcpSession {
    crs: CrsDeclaration,
    format: RowFormat,
    points: Vec<GroundControlPoint>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl GcpSession {
    /// Start an empty session in the given coordinate system.
    pub fn new(crs: CrsDeclaration) -> Self {
        Self {
            crs,
            format: RowFormat::Standard,
            points: Vec::new(),
            path: None,
            dirty: false,
        }
    }

    pub fn from_document(doc: GcpDocument) -> Self {
        Self {
            crs: doc.crs,
            format: doc.format,
            points: doc.points,
            path: None,
            dirty: false,
        }
    }

    /// Load a GCP file. Returns the session together with the rows that were
    /// rejected when `options` asks to skip bad rows.
    pub fn load(path: &Path, options: &ParseOptions) -> Result<(Self, Vec<GcpError>), SessionError> {
        let text = fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report = parse_with(&text, options)?;
        info!(
            "loaded {} GCP points from {} ({})",
            report.document.len(),
            path.display(),
            report.document.crs
        );
        let mut session = Self::from_document(report.document);
        session.path = Some(path.to_path_buf());
        Ok((session, report.rejected))
    }

    /// Write the session to `path` in the tab-separated layout ODM tools
    /// produce, with a short generator header.
    pub fn save(&mut self, path: &Path) -> Result<(), SessionError> {
        let doc = self.document()?;
        doc.points.iter().try_for_each(check_point)?;
        let options = SerializeOptions {
            delimiter: Delimiter::Tab,
            header_comments: file_header(self.format),
        };
        fs::write(path, serialize_with(&doc, &options)).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("saved {} GCP points to {}", self.points.len(), path.display());
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        self.renumber();
        Ok(())
    }

    /// Snapshot of the session as a document. Fails when there are no points.
    pub fn document(&self) -> Result<GcpDocument, GcpError> {
        if self.points.is_empty() {
            return Err(GcpError::EmptyDocument { rejected: 0 });
        }
        Ok(GcpDocument {
            crs: self.crs.clone(),
            format: self.format,
            points: self.points.clone(),
        })
    }

    pub fn validate(
        &self,
        known_images: &HashSet<String>,
        options: &ValidateOptions,
    ) -> Result<Vec<ValidationIssue>, GcpError> {
        Ok(validate_with(&self.document()?, known_images, options))
    }

    /// Append a point and return its index.
    pub fn add_point(&mut self, point: GroundControlPoint) -> Result<usize, SessionError> {
        check_point(&point)?;
        self.points.push(point);
        self.touch();
        Ok(self.points.len() - 1)
    }

    pub fn update_point(&mut self, index: usize, point: GroundControlPoint) -> Result<(), SessionError> {
        let len = self.points.len();
        let slot = self
            .points
            .get_mut(index)
            .ok_or(SessionError::NoSuchPoint { index, len })?;
        check_point(&point)?;
        *slot = point;
        self.touch();
        Ok(())
    }

    pub fn remove_point(&mut self, index: usize) -> Result<GroundControlPoint, SessionError> {
        if index >= self.points.len() {
            return Err(SessionError::NoSuchPoint {
                index,
                len: self.points.len(),
            });
        }
        let mut removed = self.points.remove(index);
        removed.source.line = None;
        self.touch();
        Ok(removed)
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.renumber();
    }

    // Once the point list changes, the loaded file's line numbers no longer
    // apply. Report rows where `save` will put them.
    fn renumber(&mut self) {
        for (index, point) in self.points.iter_mut().enumerate() {
            point.source.line = Some(FIRST_ROW_LINE + index);
        }
    }

    pub fn set_crs(&mut self, crs: CrsDeclaration) {
        if crs != self.crs {
            self.crs = crs;
            self.dirty = true;
        }
    }

    pub fn crs(&self) -> &CrsDeclaration {
        &self.crs
    }

    pub fn points(&self) -> &[GroundControlPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&GroundControlPoint> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// One-line listing entry, numbered from 1.
    pub fn summary(&self, index: usize) -> Option<String> {
        let point = self.points.get(index)?;
        let name = point
            .gcp_name
            .as_ref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        Some(format!(
            "GCP {}{}: ({:.2}, {:.2}, {:.2}) -> {}",
            index + 1,
            name,
            point.geo_x,
            point.geo_y,
            point.geo_z.unwrap_or(0.0),
            point.image_name
        ))
    }
}
