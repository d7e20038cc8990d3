//! Error types for network construction, matching and merging.

use thiserror::Error;

use crate::models::IncidentId;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("segment {segment_id}: invalid start address {value}")]
    InvalidStartAddress { segment_id: i64, value: f64 },
}

#[derive(Debug, Error)]
pub enum MatchError {
    /// Nothing to fall back to; the street network failed to load upstream
    #[error("street network is empty")]
    EmptyNetwork,

    #[error("invalid buffer distance: {0}")]
    InvalidBufferDistance(f64),

    #[error("identifier {0} matched more than once")]
    DuplicateIdentifier(IncidentId),
}

#[derive(Debug, Error)]
pub enum HotSpotError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Match(#[from] MatchError),
}
