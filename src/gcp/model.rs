// In-memory representation of an ODM ground control point file.

use super::crs::CrsDeclaration;

/// A parsed number plus the literal it was read from.
///
/// The text is only kept for plain decimal literals, so the serializer can
/// reproduce the source precision (`5.00` stays `5.00`).
#[derive(Debug, Clone)]
pub(crate) struct Literal {
    pub(crate) value: f64,
    pub(crate) text: Option<String>,
}

/// Which column layout the data rows use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowFormat {
    /// `geo_x geo_y geo_z im_x im_y image_name [gcp_name] [extras...]`
    #[default]
    Standard,
    /// `geo_x geo_y im_x im_y image_name [gcp_name] [extras...]`
    NoElevation,
}

impl RowFormat {
    /// Minimum number of tokens on a data row.
    pub fn min_fields(self) -> usize {
        match self {
            RowFormat::Standard => 6,
            RowFormat::NoElevation => 5,
        }
    }
}

/// One data row of a GCP file.
#[derive(Debug, Clone)]
pub struct GroundControlPoint {
    pub geo_x: f64,
    pub geo_y: f64,
    pub geo_z: Option<f64>,
    pub im_x: i64,
    pub im_y: i64,
    pub image_name: String,
    pub gcp_name: Option<String>,
    /// Trailing tokens after `gcp_name`, kept verbatim.
    pub extras: Vec<String>,
    pub(crate) source: PointSource,
}

/// Where a point came from; never part of equality.
#[derive(Debug, Clone, Default)]
pub(crate) struct PointSource {
    pub(crate) line: Option<usize>,
    pub(crate) geo_text: [Option<String>; 3],
}

impl GroundControlPoint {
    pub fn new(
        geo_x: f64,
        geo_y: f64,
        geo_z: Option<f64>,
        im_x: i64,
        im_y: i64,
        image_name: impl Into<String>,
    ) -> Self {
        Self {
            geo_x,
            geo_y,
            geo_z,
            im_x,
            im_y,
            image_name: image_name.into(),
            gcp_name: None,
            extras: Vec::new(),
            source: PointSource::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.gcp_name = Some(name.into());
        self
    }

    pub fn with_extras<I, S>(mut self, extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extras = extras.into_iter().map(Into::into).collect();
        self
    }

    /// 1-based line this point was read from, if it came from a file.
    pub fn source_line(&self) -> Option<usize> {
        self.source.line
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        geo: [Literal; 2],
        geo_z: Option<Literal>,
        im_x: i64,
        im_y: i64,
        image_name: String,
        gcp_name: Option<String>,
        extras: Vec<String>,
        line: usize,
    ) -> Self {
        let [x, y] = geo;
        let z_value = geo_z.as_ref().map(|z| z.value);
        let z_text = geo_z.and_then(|z| z.text);
        Self {
            geo_x: x.value,
            geo_y: y.value,
            geo_z: z_value,
            im_x,
            im_y,
            image_name,
            gcp_name,
            extras,
            source: PointSource {
                line: Some(line),
                geo_text: [x.text, y.text, z_text],
            },
        }
    }

    /// Source literal for a geo component, if it still matches the value.
    pub(crate) fn geo_literal(&self, axis: usize) -> Option<&str> {
        let value = match axis {
            0 => Some(self.geo_x),
            1 => Some(self.geo_y),
            _ => self.geo_z,
        }?;
        let text = self.source.geo_text.get(axis)?.as_deref()?;
        // Fields are public; an edited value invalidates the literal.
        match text.parse::<f64>() {
            Ok(parsed) if parsed == value => Some(text),
            _ => None,
        }
    }
}

impl PartialEq for GroundControlPoint {
    fn eq(&self, other: &Self) -> bool {
        self.geo_x == other.geo_x
            && self.geo_y == other.geo_y
            && self.geo_z == other.geo_z
            && self.im_x == other.im_x
            && self.im_y == other.im_y
            && self.image_name == other.image_name
            && self.gcp_name == other.gcp_name
            && self.extras == other.extras
    }
}

/// A CRS declaration plus the ordered list of points.
#[derive(Debug, Clone, PartialEq)]
pub struct GcpDocument {
    pub crs: CrsDeclaration,
    pub format: RowFormat,
    pub points: Vec<GroundControlPoint>,
}

impl GcpDocument {
    pub fn new(crs: CrsDeclaration, points: Vec<GroundControlPoint>) -> Self {
        Self {
            crs,
            format: RowFormat::Standard,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Line used to report on the point at `index`: its source line, or the
    /// line it lands on when the document is serialized without comments.
    pub fn line_of(&self, index: usize) -> usize {
        self.points
            .get(index)
            .and_then(GroundControlPoint::source_line)
            .unwrap_or(index + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_source_bookkeeping() {
        let literal = |v: f64, t: &str| Literal {
            value: v,
            text: Some(t.to_string()),
        };
        let parsed = GroundControlPoint::from_parts(
            [literal(1.5, "1.50"), literal(2.0, "2")],
            Some(literal(3.0, "3.000")),
            10,
            20,
            "a.jpg".into(),
            None,
            Vec::new(),
            7,
        );
        let built = GroundControlPoint::new(1.5, 2.0, Some(3.0), 10, 20, "a.jpg");
        assert_eq!(parsed, built);
        assert_eq!(parsed.source_line(), Some(7));
        assert_eq!(built.source_line(), None);
    }

    #[test]
    fn edited_value_drops_stale_literal() {
        let mut point = GroundControlPoint::from_parts(
            [
                Literal { value: 1.0, text: Some("1.0".into()) },
                Literal { value: 2.0, text: Some("2.0".into()) },
            ],
            None,
            0,
            0,
            "a.jpg".into(),
            None,
            Vec::new(),
            2,
        );
        assert_eq!(point.geo_literal(0), Some("1.0"));
        point.geo_x = 4.25;
        assert_eq!(point.geo_literal(0), None);
        assert_eq!(point.geo_literal(2), None);
    }

    #[test]
    fn line_of_falls_back_to_serialized_position() {
        let doc = GcpDocument::new(
            CrsDeclaration::wgs84(),
            vec![
                GroundControlPoint::new(0.0, 0.0, None, 1, 1, "a.jpg"),
                GroundControlPoint::new(1.0, 1.0, None, 1, 1, "b.jpg"),
            ],
        );
        assert_eq!(doc.line_of(0), 2);
        assert_eq!(doc.line_of(1), 3);
    }
}
