//! Block-level street network construction.

mod builder;

pub use builder::{block_number, build_block_streets, join_layers};

use tracing::info;

use crate::error::{MatchError, NetworkError};
use crate::matching::{StreetIndex, StreetMatcher};
use crate::models::{BlockStreet, Centerline, NetworkSegment, StreetSegment};

/// Block streets together with their spatial index.
///
/// Built once per network load and read-only afterwards, so a single
/// instance can serve any number of (parallel) matching calls.
pub struct BlockStreetNetwork {
    streets: Vec<BlockStreet>,
    index: StreetIndex,
}

impl BlockStreetNetwork {
    /// Aggregate raw segments and index the result
    pub fn from_segments(segments: Vec<StreetSegment>) -> Result<Self, NetworkError> {
        Ok(Self::from_block_streets(build_block_streets(segments)?))
    }

    /// Join the network and centerline layers, then aggregate
    pub fn from_layers(
        network: Vec<NetworkSegment>,
        centerlines: &[Centerline],
    ) -> Result<Self, NetworkError> {
        info!(
            "Joining {} network segments with {} centerlines",
            network.len(),
            centerlines.len()
        );
        Self::from_segments(join_layers(network, centerlines))
    }

    pub fn from_block_streets(streets: Vec<BlockStreet>) -> Self {
        let index = StreetIndex::build(&streets);
        Self { streets, index }
    }

    pub fn streets(&self) -> &[BlockStreet] {
        &self.streets
    }

    pub fn len(&self) -> usize {
        self.streets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streets.is_empty()
    }

    /// Look up a block street by its synthetic segment id
    pub fn get(&self, segment_id: u32) -> Option<&BlockStreet> {
        // Ids are dense when built here, but not for caller-supplied streets
        match self.streets.get(segment_id as usize) {
            Some(s) if s.segment_id == segment_id => Some(s),
            _ => self.streets.iter().find(|s| s.segment_id == segment_id),
        }
    }

    /// Matcher over this network
    pub fn matcher(
        &self,
        buffer_distance: f64,
    ) -> Result<StreetMatcher<'_, StreetIndex>, MatchError> {
        StreetMatcher::new(&self.streets, &self.index, buffer_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IncidentPoint;
    use geo::line_string;

    fn layers() -> (Vec<NetworkSegment>, Vec<Centerline>) {
        let network = vec![
            NetworkSegment {
                segment_id: 100,
                geometry: line_string![(x: 0.0, y: 0.0), (x: 50.0, y: 0.0)],
                length: 50.0,
            },
            NetworkSegment {
                segment_id: 101,
                geometry: line_string![(x: 50.0, y: 0.0), (x: 100.0, y: 0.0)],
                length: 50.0,
            },
            NetworkSegment {
                segment_id: 102,
                geometry: line_string![(x: 100.0, y: 0.0), (x: 200.0, y: 0.0)],
                length: 100.0,
            },
            NetworkSegment {
                segment_id: 103,
                geometry: line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 300.0)],
                length: 300.0,
            },
        ];
        let centerlines = vec![
            Centerline {
                segment_id: 100,
                street_name: Some("MARKET ST".into()),
                start_address: 1100.0,
            },
            Centerline {
                segment_id: 101,
                street_name: Some("MARKET ST".into()),
                start_address: 1150.0,
            },
            Centerline {
                segment_id: 102,
                street_name: Some("MARKET ST".into()),
                start_address: 1200.0,
            },
        ];
        (network, centerlines)
    }

    #[test]
    fn test_from_layers() {
        let (network, centerlines) = layers();
        let network = BlockStreetNetwork::from_layers(network, &centerlines).unwrap();

        // Segment 103 has no centerline, hence no street name
        assert_eq!(network.len(), 2);
        let first = network.get(0).unwrap();
        assert_eq!(first.block_number, 1100);
        assert_eq!(first.length, 100.0);
        assert_eq!(first.geometry.0.len(), 2);
        assert_eq!(network.get(1).unwrap().block_number, 1200);
        assert!(network.get(2).is_none());
    }

    #[test]
    fn test_matcher_reuses_index() {
        let (network, centerlines) = layers();
        let network = BlockStreetNetwork::from_layers(network, &centerlines).unwrap();
        let matcher = network.matcher(20.0).unwrap();

        let first = matcher
            .match_points(&[IncidentPoint::new(1, 25.0, 5.0)])
            .unwrap();
        let second = matcher
            .match_points(&[IncidentPoint::new(2, 150.0, -5.0)])
            .unwrap();

        assert_eq!(first[0].block_number, 1100);
        assert_eq!(second[0].block_number, 1200);
    }

    #[test]
    fn test_empty_network_matcher() {
        let network = BlockStreetNetwork::from_block_streets(vec![]);
        assert!(network.is_empty());
        assert!(matches!(network.matcher(200.0), Err(MatchError::EmptyNetwork)));
    }
}
