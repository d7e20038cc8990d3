//! Incident points and the per-identifier match results.

use geo::Point;
use serde::{Deserialize, Serialize};

/// Unique identifier of an incident row.
///
/// Upstream datasets key rows by either a numeric id or a string key, so both
/// are accepted. Numbers and strings never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncidentId {
    Number(i64),
    Text(String),
}

impl IncidentId {
    /// Parse an id column value.
    ///
    /// Only canonical integers become numbers, so "007", "+7" and "7" stay
    /// distinct identifiers.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => IncidentId::Number(n),
            _ => IncidentId::Text(raw.to_string()),
        }
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentId::Number(n) => write!(f, "{}", n),
            IncidentId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for IncidentId {
    fn from(value: i64) -> Self {
        IncidentId::Number(value)
    }
}

impl From<i32> for IncidentId {
    fn from(value: i32) -> Self {
        IncidentId::Number(value.into())
    }
}

impl From<&str> for IncidentId {
    fn from(value: &str) -> Self {
        IncidentId::Text(value.to_string())
    }
}

/// Anything that can be matched to a street: an identifier and a location.
///
/// A `None` location is an empty geometry; such records are never matched,
/// and neither are locations with non-finite coordinates.
pub trait Located {
    fn id(&self) -> &IncidentId;
    fn location(&self) -> Option<Point<f64>>;
}

/// Point record to be matched
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentPoint {
    pub id: IncidentId,
    pub geometry: Option<Point<f64>>,
}

impl IncidentPoint {
    pub fn new(id: impl Into<IncidentId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            geometry: Some(Point::new(x, y)),
        }
    }

    /// A record whose geometry is empty
    pub fn empty(id: impl Into<IncidentId>) -> Self {
        Self {
            id: id.into(),
            geometry: None,
        }
    }
}

impl Located for IncidentPoint {
    fn id(&self) -> &IncidentId {
        &self.id
    }

    fn location(&self) -> Option<Point<f64>> {
        self.geometry
    }
}

/// Street assigned to one unique identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub id: IncidentId,
    pub segment_id: u32,
    pub street_name: String,
    pub block_number: i64,
    /// Summed length of the assigned block street
    pub length: f64,
    /// True distance from the point to the unbuffered block geometry
    pub distance: f64,
    /// Resolved by the nearest-neighbor pass instead of buffer containment
    pub matched_with_fallback: bool,
}
