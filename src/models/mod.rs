//! Core data models for street block matching.

pub mod incident;
pub mod street;

pub use incident::{IncidentId, IncidentPoint, Located, MatchResult};
pub use street::{BlockKey, BlockStreet, Centerline, NetworkSegment, StreetSegment};
