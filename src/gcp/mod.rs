//! Ground control point files as consumed by OpenDroneMap.
//!
//! ```text
//! EPSG:32610
//! 544256.7 5320919.9 5 3044 2622 IMG_0525.jpg GCP01
//! ```
//!
//! The first significant line declares the coordinate system, each further
//! line ties a surveyed ground position to a pixel in one image. [`parse`]
//! reads that text into a [`GcpDocument`], [`serialize`] writes it back and
//! [`validate`] checks it against the task's image set. All three are pure
//! functions over in-memory data.

mod crs;
mod error;
mod model;
mod parser;
mod serializer;
mod session;
mod validate;

pub use crs::{CrsDeclaration, CrsKind};
pub use error::{GcpError, SessionError};
pub use model::{GcpDocument, GroundControlPoint, RowFormat};
pub use parser::{parse, parse_with, ParseOptions, ParseReport, RowErrorPolicy};
pub use serializer::{serialize, serialize_with, Delimiter, SerializeOptions};
pub use session::{check_field, GcpSession};
pub use validate::{validate, validate_with, ValidateOptions, ValidationIssue, MIN_GROUND_POINTS};
