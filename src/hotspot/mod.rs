//! Street hot spot attributes for incident datasets.
//!
//! Matches every located row to a block street and broadcasts the street
//! attributes back onto the full dataset, duplicates included. Blocks longer
//! than [`LONG_SEGMENT_THRESHOLD`] are not meaningful hot spots and leave the
//! row unassigned.

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::error::HotSpotError;
use crate::models::{IncidentId, Located, MatchResult};
use crate::network::BlockStreetNetwork;

/// Search radius used by the dashboard, in projected units (feet)
pub const DEFAULT_BUFFER_DISTANCE: f64 = 200.0;

/// Aggregated block streets longer than this are dropped from the output
pub const LONG_SEGMENT_THRESHOLD: f64 = 5200.0;

/// Street fields attached to an enriched row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreetAttributes {
    pub segment_id: Option<u32>,
    pub street_name: Option<String>,
    pub block_number: Option<i64>,
    pub length: Option<f64>,
}

impl StreetAttributes {
    fn from_match(result: &MatchResult) -> Self {
        Self {
            segment_id: Some(result.segment_id),
            street_name: Some(result.street_name.clone()),
            block_number: Some(result.block_number),
            length: Some(result.length),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.segment_id.is_some()
    }

    /// Segment id as written to output files
    pub fn segment_id_string(&self) -> String {
        format_segment_id(self.segment_id)
    }
}

/// Decimal segment id, or an empty string when unassigned
pub fn format_segment_id(segment_id: Option<u32>) -> String {
    segment_id.map(|id| id.to_string()).unwrap_or_default()
}

/// An input row with its street attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<R> {
    pub record: R,
    pub street: StreetAttributes,
}

/// Attaches block street attributes to incident rows
pub struct HotSpotMerger<'a> {
    network: &'a BlockStreetNetwork,
    buffer_distance: f64,
    max_segment_length: f64,
    parallel: bool,
}

impl<'a> HotSpotMerger<'a> {
    pub fn new(network: &'a BlockStreetNetwork) -> Self {
        Self {
            network,
            buffer_distance: DEFAULT_BUFFER_DISTANCE,
            max_segment_length: LONG_SEGMENT_THRESHOLD,
            parallel: false,
        }
    }

    pub fn with_buffer_distance(mut self, buffer_distance: f64) -> Self {
        self.buffer_distance = buffer_distance;
        self
    }

    pub fn with_max_segment_length(mut self, max_segment_length: f64) -> Self {
        self.max_segment_length = max_segment_length;
        self
    }

    /// Match on the rayon pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Street attributes for every matched identifier, long blocks removed
    pub fn street_attributes<R: Located + Sync>(
        &self,
        rows: &[R],
    ) -> Result<HashMap<IncidentId, StreetAttributes>, HotSpotError> {
        let matcher = self.network.matcher(self.buffer_distance)?;
        let results = if self.parallel {
            matcher.match_points_par(rows)?
        } else {
            matcher.match_points(rows)?
        };

        let matched = results.len();
        let attributes: HashMap<IncidentId, StreetAttributes> = results
            .into_iter()
            .filter(|r| r.length <= self.max_segment_length)
            .map(|r| {
                let attributes = StreetAttributes::from_match(&r);
                (r.id, attributes)
            })
            .collect();

        debug!(
            "Dropped {} matches on blocks longer than {}",
            matched - attributes.len(),
            self.max_segment_length
        );

        Ok(attributes)
    }

    /// Enrich every row, including duplicates and rows without geometry.
    ///
    /// Unmatched rows get empty attributes; the output has the same length
    /// and order as the input.
    pub fn merge<R: Located + Sync>(&self, rows: Vec<R>) -> Result<Vec<Enriched<R>>, HotSpotError> {
        let empty = rows.iter().filter(|r| r.location().is_none()).count();
        if empty > 0 {
            debug!("{} rows have empty geometry and will not be matched", empty);
        }

        let attributes = self.street_attributes(&rows)?;

        let enriched: Vec<Enriched<R>> = rows
            .into_iter()
            .map(|record| {
                let street = attributes.get(record.id()).cloned().unwrap_or_default();
                Enriched { record, street }
            })
            .collect();

        info!(
            "Assigned hot spot streets to {} of {} rows",
            enriched.iter().filter(|e| e.street.is_assigned()).count(),
            enriched.len()
        );

        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use crate::models::{BlockStreet, IncidentPoint};
    use geo::{line_string, MultiLineString};

    fn main_street() -> BlockStreetNetwork {
        BlockStreetNetwork::from_block_streets(vec![
            BlockStreet {
                segment_id: 0,
                street_name: "Main St".into(),
                block_number: 100,
                geometry: MultiLineString::new(vec![
                    line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
                ]),
                length: 400.0,
            },
            BlockStreet {
                segment_id: 1,
                street_name: "Main St".into(),
                block_number: 200,
                geometry: MultiLineString::new(vec![
                    line_string![(x: 100.0, y: 0.0), (x: 6100.0, y: 0.0)],
                ]),
                length: 6000.0,
            },
        ])
    }

    #[test]
    fn test_format_segment_id() {
        assert_eq!(format_segment_id(Some(0)), "0");
        assert_eq!(format_segment_id(Some(1234)), "1234");
        assert_eq!(format_segment_id(None), "");
    }

    #[test]
    fn test_main_street_merge() {
        let network = main_street();
        let rows = vec![
            IncidentPoint::new("P1", 50.0, 0.0),
            IncidentPoint::new("P2", 3000.0, 0.0),
            IncidentPoint::new("P3", -500.0, 0.0),
        ];

        let merged = HotSpotMerger::new(&network).merge(rows).unwrap();
        assert_eq!(merged.len(), 3);

        assert_eq!(merged[0].street.segment_id_string(), "0");
        assert_eq!(merged[0].street.street_name.as_deref(), Some("Main St"));
        assert_eq!(merged[0].street.block_number, Some(100));

        // Matched to the 6000 unit block, which is too long to keep
        assert_eq!(merged[1].street, StreetAttributes::default());
        assert_eq!(merged[1].street.segment_id_string(), "");

        // Outside both buffers, nearest block wins
        assert_eq!(merged[2].street.segment_id, Some(0));
    }

    #[test]
    fn test_threshold_boundary_is_kept() {
        let network = main_street();
        let rows = vec![IncidentPoint::new(1, 3000.0, 0.0)];

        let merged = HotSpotMerger::new(&network)
            .with_max_segment_length(6000.0)
            .merge(rows)
            .unwrap();
        assert_eq!(merged[0].street.segment_id, Some(1));
    }

    #[test]
    fn test_duplicates_and_empty_rows_broadcast() {
        let network = main_street();
        let rows = vec![
            IncidentPoint::new(1, 10.0, 5.0),
            IncidentPoint::empty(2),
            IncidentPoint::new(1, 10.0, 5.0),
            IncidentPoint::empty(1),
        ];

        let merged = HotSpotMerger::new(&network).merge(rows.clone()).unwrap();
        assert_eq!(merged.len(), 4);

        for (row, enriched) in rows.iter().zip(&merged) {
            assert_eq!(row, &enriched.record);
        }
        assert_eq!(merged[0].street.segment_id, Some(0));
        assert!(!merged[1].street.is_assigned());
        assert_eq!(merged[2].street, merged[0].street);
        // Same identifier, so it shares the street even without geometry
        assert_eq!(merged[3].street, merged[0].street);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let network = main_street();
        let rows: Vec<IncidentPoint> = (0..200)
            .map(|i| {
                IncidentPoint::new(i % 150, (i * 37 % 700) as f64 - 100.0, (i * 13 % 90) as f64)
            })
            .collect();

        let merger = HotSpotMerger::new(&network);
        let first = merger.merge(rows).unwrap();
        let stripped: Vec<IncidentPoint> = first.iter().map(|e| e.record.clone()).collect();
        let second = merger.merge(stripped).unwrap();
        assert_eq!(first, second);

        let parallel = HotSpotMerger::new(&network).parallel(true).merge(
            first.iter().map(|e| e.record.clone()).collect(),
        );
        assert_eq!(first, parallel.unwrap());
    }

    #[test]
    fn test_empty_network_propagates() {
        let network = BlockStreetNetwork::from_block_streets(vec![]);
        let err = HotSpotMerger::new(&network)
            .merge(vec![IncidentPoint::new(1, 0.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, HotSpotError::Match(MatchError::EmptyNetwork)));
    }
}
