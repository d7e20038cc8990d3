//! Street network records: raw layer rows and the aggregated block streets.

use geo::{LineString, MultiLineString};

/// A row of the street network layer (geometry + network length).
#[derive(Debug, Clone)]
pub struct NetworkSegment {
    pub segment_id: i64,
    pub geometry: LineString<f64>,
    pub length: f64,
}

/// A row of the centerline attribute layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Centerline {
    pub segment_id: i64,
    pub street_name: Option<String>,
    /// Left-side "from" address of the segment
    pub start_address: f64,
}

/// Raw street segment with its centerline attributes attached
#[derive(Debug, Clone)]
pub struct StreetSegment {
    pub segment_id: i64,
    pub geometry: LineString<f64>,
    pub street_name: Option<String>,
    pub start_address: f64,
    pub length: f64,
}

impl StreetSegment {
    pub fn new(
        segment_id: i64,
        geometry: LineString<f64>,
        street_name: Option<&str>,
        start_address: f64,
        length: f64,
    ) -> Self {
        Self {
            segment_id,
            geometry,
            street_name: street_name.map(str::to_string),
            start_address,
            length,
        }
    }

    /// Street name, if present and not blank
    pub fn name(&self) -> Option<&str> {
        self.street_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Grouping key of a block street
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub street_name: String,
    pub block_number: i64,
}

/// Street segments aggregated by (street name, block number).
///
/// `segment_id` is synthetic: a dense index over the groups, not any of the
/// raw segment identifiers.
#[derive(Debug, Clone)]
pub struct BlockStreet {
    pub segment_id: u32,
    pub street_name: String,
    pub block_number: i64,
    pub geometry: MultiLineString<f64>,
    pub length: f64,
}
