//! Point-to-street matching.
//!
//! Points are matched to block streets by buffered containment with an
//! R-tree broad phase, exact-distance tie-breaks, and a nearest-neighbor
//! fallback for points outside every buffer.

mod index;
mod matcher;
mod resolver;

pub use index::{line_distance, street_distance, LinearScan, StreetIndex, StreetQuery};
pub use matcher::{match_points_to_streets, StreetMatcher};
pub use resolver::{dedup_by_id, resolve_nearest, Candidate, MatchTable};
