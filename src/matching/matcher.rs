//! Buffered point-to-street matching with nearest-neighbor fallback.

use geo::Point;
use rayon::prelude::*;
use tracing::{debug, info};

use super::index::{StreetIndex, StreetQuery};
use super::resolver::{dedup_by_id, resolve_nearest, Candidate, MatchTable};
use crate::error::MatchError;
use crate::models::{BlockStreet, IncidentId, Located, MatchResult};

/// Matches point records against a block street network.
///
/// Each unique identifier is matched once:
/// 1. Containment: every street whose buffer (radius `buffer_distance`)
///    strictly contains the point is a candidate; the one at minimum true
///    distance wins.
/// 2. Fallback: points inside no buffer take the globally nearest street.
///
/// Records with empty or non-finite geometry are skipped and absent from the
/// results.
pub struct StreetMatcher<'a, Q: StreetQuery> {
    streets: &'a [BlockStreet],
    index: &'a Q,
    buffer_distance: f64,
}

impl<'a, Q: StreetQuery> StreetMatcher<'a, Q> {
    /// `index` must have been built from `streets`
    pub fn new(
        streets: &'a [BlockStreet],
        index: &'a Q,
        buffer_distance: f64,
    ) -> Result<Self, MatchError> {
        if !buffer_distance.is_finite() || buffer_distance < 0.0 {
            return Err(MatchError::InvalidBufferDistance(buffer_distance));
        }
        if streets.is_empty() || index.street_count() == 0 {
            return Err(MatchError::EmptyNetwork);
        }

        Ok(Self {
            streets,
            index,
            buffer_distance,
        })
    }

    /// Match a single located point
    pub fn match_point(
        &self,
        id: &IncidentId,
        point: Point<f64>,
    ) -> Result<MatchResult, MatchError> {
        let candidates = self.index.candidates_within(point, self.buffer_distance);

        let (chosen, matched_with_fallback) = match resolve_nearest(&candidates) {
            Some(best) => (best, false),
            None => (
                self.index.nearest(point).ok_or(MatchError::EmptyNetwork)?,
                true,
            ),
        };

        Ok(self.to_result(id, chosen, matched_with_fallback))
    }

    fn to_result(
        &self,
        id: &IncidentId,
        chosen: Candidate,
        matched_with_fallback: bool,
    ) -> MatchResult {
        let street = &self.streets[chosen.street];
        MatchResult {
            id: id.clone(),
            segment_id: street.segment_id,
            street_name: street.street_name.clone(),
            block_number: street.block_number,
            length: street.length,
            distance: chosen.distance,
            matched_with_fallback,
        }
    }

    /// Match every unique identifier with a non-empty geometry
    pub fn match_points<R: Located>(
        &self,
        records: &[R],
    ) -> Result<Vec<MatchResult>, MatchError> {
        let located = unique_located(records);

        let results = located
            .into_iter()
            .map(|(id, point)| self.match_point(id, point))
            .collect::<Result<Vec<_>, _>>()?;

        finish(records.len(), results)
    }
}

impl<'a, Q: StreetQuery + Sync> StreetMatcher<'a, Q> {
    /// Same as [`StreetMatcher::match_points`], spread over the rayon pool
    pub fn match_points_par<R: Located + Sync>(
        &self,
        records: &[R],
    ) -> Result<Vec<MatchResult>, MatchError> {
        let located = unique_located(records);

        let results = located
            .into_par_iter()
            .map(|(id, point)| self.match_point(id, point))
            .collect::<Result<Vec<_>, _>>()?;

        finish(records.len(), results)
    }
}

/// Location usable for matching; non-finite coordinates count as empty
fn usable_location<R: Located>(record: &R) -> Option<Point<f64>> {
    record
        .location()
        .filter(|p| p.x().is_finite() && p.y().is_finite())
}

/// Drop empty geometries, then keep the first row of every identifier
fn unique_located<R: Located>(records: &[R]) -> Vec<(&IncidentId, Point<f64>)> {
    let located: Vec<(&IncidentId, Point<f64>)> =
        dedup_by_id(records.iter().filter(|r| usable_location(*r).is_some()))
            .into_iter()
            .filter_map(|r| usable_location(r).map(|p| (r.id(), p)))
            .collect();

    debug!(
        "{} records, {} unique identifiers with geometry",
        records.len(),
        located.len()
    );

    located
}

fn finish(total: usize, results: Vec<MatchResult>) -> Result<Vec<MatchResult>, MatchError> {
    let table = MatchTable::try_from(results)?;
    let fallback = table.iter().filter(|r| r.matched_with_fallback).count();

    info!(
        "Matched {} of {} records to streets ({} by buffer, {} by nearest fallback)",
        table.len(),
        total,
        table.len() - fallback,
        fallback
    );

    Ok(table.into_results())
}

/// Match points to block streets, building a spatial index for the call.
///
/// Use [`crate::network::BlockStreetNetwork`] to reuse the index across
/// calls.
pub fn match_points_to_streets<R: Located>(
    points: &[R],
    block_streets: &[BlockStreet],
    buffer_distance: f64,
) -> Result<Vec<MatchResult>, MatchError> {
    let index = StreetIndex::build(block_streets);
    StreetMatcher::new(block_streets, &index, buffer_distance)?.match_points(points)
}
