// GCP text writer.

use super::model::{GcpDocument, GroundControlPoint, RowFormat};

/// Field separator used on data rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delimiter {
    #[default]
    Space,
    Tab,
}

impl Delimiter {
    fn as_str(self) -> &'static str {
        match self {
            Delimiter::Space => " ",
            Delimiter::Tab => "\t",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    pub delimiter: Delimiter,
    /// Written as `# ...` lines right after the CRS declaration.
    pub header_comments: Vec<String>,
}

/// Render a document in the canonical space-separated format.
pub fn serialize(doc: &GcpDocument) -> String {
    serialize_with(doc, &SerializeOptions::default())
}

pub fn serialize_with(doc: &GcpDocument, options: &SerializeOptions) -> String {
    let mut out = String::new();
    out.push_str(doc.crs.as_str());
    out.push('\n');
    // Each physical line of a comment gets its own marker.
    for line in options.header_comments.iter().flat_map(|c| c.split('\n')) {
        out.push_str("# ");
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
        out.push('\n');
    }
    for point in &doc.points {
        write_row(&mut out, point, doc.format, options.delimiter.as_str());
        out.push('\n');
    }
    out
}

fn write_row(out: &mut String, point: &GroundControlPoint, format: RowFormat, sep: &str) {
    let mut fields: Vec<String> = Vec::with_capacity(7 + point.extras.len());
    fields.push(geo_field(point, 0, point.geo_x));
    fields.push(geo_field(point, 1, point.geo_y));
    if format == RowFormat::Standard {
        // Elevation is mandatory in this layout; points built without one get 0.
        fields.push(geo_field(point, 2, point.geo_z.unwrap_or(0.0)));
    }
    fields.push(point.im_x.to_string());
    fields.push(point.im_y.to_string());
    fields.push(point.image_name.clone());
    if let Some(name) = &point.gcp_name {
        fields.push(name.clone());
    }
    fields.extend(point.extras.iter().cloned());
    out.push_str(&fields.join(sep));
}

fn geo_field(point: &GroundControlPoint, axis: usize, value: f64) -> String {
    match point.geo_literal(axis) {
        Some(text) => text.to_string(),
        None => format_real(value),
    }
}

/// Shortest decimal that reads back to the same `f64`. `Display` for floats
/// never switches to exponent notation.
fn format_real(value: f64) -> String {
    if value == 0.0 {
        // Normalize -0.
        return "0".to_string();
    }
    value.to_string()
}
