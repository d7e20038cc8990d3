//! Streetblock - street hot spot matching for point incident data
//!
//! Builds a block-level street network from raw centerline segments and
//! assigns every incident point to its nearest named street block.

pub mod error;
pub mod hotspot;
pub mod matching;
pub mod models;
pub mod network;

pub use error::{HotSpotError, MatchError, NetworkError};
pub use hotspot::{Enriched, HotSpotMerger, StreetAttributes};
pub use models::{BlockStreet, IncidentId, IncidentPoint, Located, MatchResult, StreetSegment};
pub use network::BlockStreetNetwork;
