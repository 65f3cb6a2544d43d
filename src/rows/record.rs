use crate::core::{Fields, ModelError, Point, Result, RowId, Value};
use serde::{Deserialize, Serialize};

/// Minimum number of points of a polygon ring.
pub const MIN_RING_POINTS: usize = 3;

/// A single row of a named table, optionally carrying geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub id: RowId,
    pub table: String,
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Point>>,
}

impl RowRecord {
    pub fn new(table: impl Into<String>, fields: Fields, geometry: Option<Vec<Point>>) -> Self {
        Self {
            id: RowId::next(),
            table: table.into(),
            fields,
            geometry,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Rejects rings with fewer than [`MIN_RING_POINTS`] points.
///
/// Closure (first point equal to last) is not checked; use [`close_ring`]
/// before inserting when the target table expects closed rings.
pub fn validate_geometry(points: &[Point]) -> Result<()> {
    if points.len() < MIN_RING_POINTS {
        return Err(ModelError::ValidationError(format!(
            "geometry needs at least {} points, got {}",
            MIN_RING_POINTS,
            points.len()
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(ModelError::ValidationError(
            "geometry contains non-finite coordinates".to_string(),
        ));
    }
    Ok(())
}

pub fn is_closed(points: &[Point]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => points.len() > 1 && first == last,
        _ => false,
    }
}

/// Appends the first point when the ring is open.
pub fn close_ring(mut points: Vec<Point>) -> Vec<Point> {
    if !points.is_empty() && !is_closed(&points) {
        let first = points[0];
        points.push(first);
    }
    points
}
