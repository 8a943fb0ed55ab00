// Coordinate reference system declaration: the first significant line of
// a GCP file.

use std::fmt;

/// How the coordinate system was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrsKind {
    /// `EPSG:<code>`
    Epsg(u32),
    /// A PROJ definition string starting with `+proj=`.
    Proj,
}

/// The coordinate system header of a GCP document.
///
/// The declaration is kept verbatim (minus surrounding whitespace) so that
/// writing the document back reproduces the header exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsDeclaration {
    kind: CrsKind,
    raw: String,
}

impl CrsDeclaration {
    /// Recognize a header line. Returns `None` when the line is neither an
    /// EPSG code nor a PROJ string.
    pub fn recognize(line: &str) -> Option<Self> {
        let raw = line.trim();
        if let Some(code) = raw.strip_prefix("EPSG:") {
            if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let code = code.parse::<u32>().ok()?;
            return Some(Self {
                kind: CrsKind::Epsg(code),
                raw: raw.to_string(),
            });
        }
        if raw.starts_with("+proj=") {
            return Some(Self {
                kind: CrsKind::Proj,
                raw: raw.to_string(),
            });
        }
        None
    }

    /// Declaration for an EPSG code.
    pub fn epsg(code: u32) -> Self {
        Self {
            kind: CrsKind::Epsg(code),
            raw: format!("EPSG:{code}"),
        }
    }

    /// WGS84 geographic, the fallback used when a new session has no header.
    pub fn wgs84() -> Self {
        Self::epsg(4326)
    }

    pub fn kind(&self) -> &CrsKind {
        &self.kind
    }

    pub fn epsg_code(&self) -> Option<u32> {
        match self.kind {
            CrsKind::Epsg(code) => Some(code),
            CrsKind::Proj => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CrsDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_epsg_codes() {
        let crs = CrsDeclaration::recognize("  EPSG:32610 ").unwrap();
        assert_eq!(crs.epsg_code(), Some(32610));
        assert_eq!(crs.as_str(), "EPSG:32610");
    }

    #[test]
    fn recognizes_proj_strings() {
        let line = "+proj=utm +zone=10 +ellps=WGS84 +datum=WGS84 +units=m +no_defs";
        let crs = CrsDeclaration::recognize(line).unwrap();
        assert_eq!(crs.kind(), &CrsKind::Proj);
        assert_eq!(crs.to_string(), line);
    }

    #[test]
    fn rejects_everything_else() {
        for line in ["bogus", "EPSG:", "EPSG:12a", "epsg:4326", "EPSG: 4326", "proj=utm", "WGS84 UTM 10N"] {
            assert!(CrsDeclaration::recognize(line).is_none(), "{line}");
        }
    }
}
