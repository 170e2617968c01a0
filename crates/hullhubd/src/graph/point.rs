use std::fmt;

use thiserror::Error;

/// Coordinate tolerance used when matching points for removal.
pub const POINT_EPSILON: f64 = 1e-9;

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Builds a point from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` when both coordinates differ by less than
    /// [`POINT_EPSILON`].
    #[must_use]
    pub fn approx_eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < POINT_EPSILON && (self.y - other.y).abs() < POINT_EPSILON
    }

    /// Parses `x,y` text.
    ///
    /// Whitespace anywhere inside either coordinate is ignored, so `" 1 , 2"`
    /// and `"1,2"` are the same point.
    ///
    /// # Errors
    ///
    /// Fails when the comma is missing, a coordinate is empty, or a coordinate
    /// is not a finite number.
    pub fn parse(text: &str) -> Result<Self, PointParseError> {
        let (raw_x, raw_y) = text.split_once(',').ok_or(PointParseError::MissingComma)?;
        Ok(Self::new(coordinate(raw_x)?, coordinate(raw_y)?))
    }
}

fn coordinate(raw: &str) -> Result<f64, PointParseError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(PointParseError::EmptyCoordinate);
    }
    match compact.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PointParseError::InvalidNumber(compact)),
    }
}

impl fmt::Display for Point {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "({},{})", self.x, self.y)
    }
}

/// Reasons a point could not be read from client text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointParseError {
    /// No comma separated the coordinates.
    #[error("Invalid point format: missing comma")]
    MissingComma,
    /// One side of the comma was blank.
    #[error("Invalid point format: empty coordinate")]
    EmptyCoordinate,
    /// A coordinate was not a finite decimal number.
    #[error("Invalid point format: '{0}' is not a number")]
    InvalidNumber(String),
}
