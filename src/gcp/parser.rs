// GCP text parser.
//
// The format is line oriented: the first significant line declares the
// coordinate system, every following significant line is one point.
// Blank lines and `#` comments are skipped but still counted, so reported
// line numbers match what an editor shows.

use log::{debug, warn};

use super::crs::CrsDeclaration;
use super::error::GcpError;
use super::model::{GcpDocument, GroundControlPoint, Literal, RowFormat};

/// What to do with a data row that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowErrorPolicy {
    /// Stop at the first bad row and return its error.
    #[default]
    Abort,
    /// Drop the row, remember the error, keep going.
    Skip,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub format: RowFormat,
    pub on_row_error: RowErrorPolicy,
}

/// Result of a successful parse, including rows dropped under
/// [`RowErrorPolicy::Skip`].
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub document: GcpDocument,
    pub rejected: Vec<GcpError>,
}

/// Parse a GCP file in the standard format, aborting on the first bad row.
pub fn parse(text: &str) -> Result<GcpDocument, GcpError> {
    parse_with(text, &ParseOptions::default()).map(|report| report.document)
}

/// Parse a GCP file with explicit options.
pub fn parse_with(text: &str, options: &ParseOptions) -> Result<ParseReport, GcpError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| is_significant(line));

    let Some((crs_line, crs_text)) = lines.next() else {
        return Err(GcpError::EmptyDocument { rejected: 0 });
    };
    let crs = CrsDeclaration::recognize(crs_text).ok_or_else(|| GcpError::InvalidCrsFormat {
        line: crs_line,
        text: crs_text.trim().to_string(),
    })?;

    let mut points = Vec::new();
    let mut rejected = Vec::new();
    for (line_no, line) in lines {
        match parse_row(line_no, line, options.format) {
            Ok(point) => points.push(point),
            Err(err) => match options.on_row_error {
                RowErrorPolicy::Abort => return Err(err),
                RowErrorPolicy::Skip => {
                    warn!("skipping GCP row: {err}");
                    rejected.push(err);
                }
            },
        }
    }

    if points.is_empty() {
        return Err(GcpError::EmptyDocument {
            rejected: rejected.len(),
        });
    }

    debug!(
        "parsed {} GCP rows in {} ({} rejected)",
        points.len(),
        crs,
        rejected.len()
    );
    Ok(ParseReport {
        document: GcpDocument {
            crs,
            format: options.format,
            points,
        },
        rejected,
    })
}

fn is_significant(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn parse_row(line_no: usize, line: &str, format: RowFormat) -> Result<GroundControlPoint, GcpError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let expected = format.min_fields();
    if tokens.len() < expected {
        return Err(GcpError::MalformedRow {
            line: line_no,
            text: line.trim().to_string(),
            found: tokens.len(),
            expected,
        });
    }

    let row = Row { line_no, line, tokens: &tokens };
    let geo_x = row.real(0, "geo_x")?;
    let geo_y = row.real(1, "geo_y")?;
    let (geo_z, pixel_at) = match format {
        RowFormat::Standard => (Some(row.real(2, "geo_z")?), 3),
        RowFormat::NoElevation => (None, 2),
    };
    let im_x = row.integer(pixel_at, "im_x")?;
    let im_y = row.integer(pixel_at + 1, "im_y")?;

    let image_name = tokens[pixel_at + 2].to_string();
    let gcp_name = tokens.get(pixel_at + 3).map(|s| s.to_string());
    let extras = tokens
        .iter()
        .skip(pixel_at + 4)
        .map(|s| s.to_string())
        .collect();

    Ok(GroundControlPoint::from_parts(
        [geo_x, geo_y],
        geo_z,
        im_x,
        im_y,
        image_name,
        gcp_name,
        extras,
        line_no,
    ))
}

struct Row<'a> {
    line_no: usize,
    line: &'a str,
    tokens: &'a [&'a str],
}

impl Row<'_> {
    fn invalid(&self, index: usize, field: &'static str) -> GcpError {
        GcpError::InvalidCoordinate {
            line: self.line_no,
            column: index + 1,
            field,
            token: self.tokens[index].to_string(),
            text: self.line.trim().to_string(),
        }
    }

    fn real(&self, index: usize, field: &'static str) -> Result<Literal, GcpError> {
        let token = self.tokens[index];
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Literal {
                value,
                text: is_plain_decimal(token).then(|| token.to_string()),
            }),
            _ => Err(self.invalid(index, field)),
        }
    }

    fn integer(&self, index: usize, field: &'static str) -> Result<i64, GcpError> {
        self.tokens[index]
            .parse::<i64>()
            .map_err(|_| self.invalid(index, field))
    }
}

/// `[+-]digits[.digits]`, the only literals worth echoing back verbatim.
fn is_plain_decimal(token: &str) -> bool {
    let body = token.strip_prefix(['+', '-']).unwrap_or(token);
    let (int, frac) = match body.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (body, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}
