//! Dedup and tie-break rules: one street per unique identifier.

use std::cmp::Ordering;

use hashbrown::{HashMap, HashSet};

use crate::error::MatchError;
use crate::models::{IncidentId, Located, MatchResult};

/// A street that may be assigned to a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position of the street in the network
    pub street: usize,
    pub segment_id: u32,
    /// True distance to the unbuffered street geometry
    pub distance: f64,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then(self.segment_id.cmp(&other.segment_id))
    }
}

/// Reduce candidates to the one with minimum distance.
///
/// Exact distance ties go to the lowest segment id.
pub fn resolve_nearest(candidates: &[Candidate]) -> Option<Candidate> {
    candidates.iter().copied().min_by(|a, b| a.rank(b))
}

/// Keep the first record for every identifier, preserving input order
pub fn dedup_by_id<'a, R, I>(records: I) -> Vec<&'a R>
where
    R: Located + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut seen: HashSet<&IncidentId> = HashSet::new();
    let mut unique = Vec::new();
    for record in records {
        if seen.insert(record.id()) {
            unique.push(record);
        }
    }
    unique
}

/// Mapping from identifier to its single match.
///
/// Keeps insertion order for output and rejects a second match for the same
/// identifier.
#[derive(Debug, Default)]
pub struct MatchTable {
    results: Vec<MatchResult>,
    by_id: HashMap<IncidentId, usize>,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: MatchResult) -> Result<(), MatchError> {
        if self.by_id.contains_key(&result.id) {
            return Err(MatchError::DuplicateIdentifier(result.id));
        }
        self.by_id.insert(result.id.clone(), self.results.len());
        self.results.push(result);
        Ok(())
    }

    pub fn get(&self, id: &IncidentId) -> Option<&MatchResult> {
        self.by_id.get(id).map(|&i| &self.results[i])
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter()
    }

    pub fn into_results(self) -> Vec<MatchResult> {
        self.results
    }
}

impl TryFrom<Vec<MatchResult>> for MatchTable {
    type Error = MatchError;

    fn try_from(results: Vec<MatchResult>) -> Result<Self, Self::Error> {
        let mut table = MatchTable::new();
        for result in results {
            table.insert(result)?;
        }
        Ok(table)
    }
}
