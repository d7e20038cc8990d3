//! Spatial index for candidate block street lookups.

use geo::{BoundingRect, Distance, Euclidean, LineString, MultiLineString, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::info;

use super::resolver::{resolve_nearest, Candidate};
use crate::models::BlockStreet;

/// Broad-phase queries over a block street network.
///
/// Candidates refer to streets by their position in the slice the index was
/// built from and carry the true (unbuffered) distance to the query point.
pub trait StreetQuery {
    /// Every street with some line strictly closer than `radius` to `point`.
    ///
    /// A street may appear once per constituent line.
    fn candidates_within(&self, point: Point<f64>, radius: f64) -> Vec<Candidate>;

    /// The globally closest street, ties broken by lowest segment id.
    fn nearest(&self, point: Point<f64>) -> Option<Candidate>;

    /// Number of indexed streets
    fn street_count(&self) -> usize;
}

/// Distance from a point to a single line
pub fn line_distance(point: &Point<f64>, line: &LineString<f64>) -> f64 {
    Euclidean.distance(point, line)
}

/// Distance from a point to the closest line of a block street
pub fn street_distance(point: &Point<f64>, geometry: &MultiLineString<f64>) -> f64 {
    geometry
        .0
        .iter()
        .filter(|line| line.0.len() >= 2)
        .map(|line| line_distance(point, line))
        .fold(f64::INFINITY, f64::min)
}

/// One constituent line of a block street stored in the R-tree
#[derive(Debug, Clone)]
pub struct IndexedLine {
    /// Position of the owning street in the network
    pub street: usize,
    line: LineString<f64>,
    envelope: AABB<[f64; 2]>,
}

impl IndexedLine {
    /// `None` for lines with fewer than two coordinates
    pub fn new(street: usize, line: LineString<f64>) -> Option<Self> {
        if line.0.len() < 2 {
            return None;
        }
        let rect = line.bounding_rect()?;
        Some(Self {
            street,
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
            line,
        })
    }
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedLine {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d = line_distance(&Point::new(point[0], point[1]), &self.line);
        d * d
    }
}

/// R-tree over every line of every block street
pub struct StreetIndex {
    tree: RTree<IndexedLine>,
    segment_ids: Vec<u32>,
}

impl StreetIndex {
    /// Build the index from block streets
    pub fn build(streets: &[BlockStreet]) -> Self {
        let lines: Vec<IndexedLine> = streets
            .iter()
            .enumerate()
            .flat_map(|(street, s)| {
                s.geometry
                    .0
                    .iter()
                    .filter_map(move |line| IndexedLine::new(street, line.clone()))
            })
            .collect();

        let tree = RTree::bulk_load(lines);

        info!(
            "Street index built with {} lines over {} block streets",
            tree.size(),
            streets.len()
        );

        Self {
            tree,
            segment_ids: streets.iter().map(|s| s.segment_id).collect(),
        }
    }

    fn within_squared(&self, point: Point<f64>, max_distance_2: f64) -> Vec<Candidate> {
        self.tree
            .locate_within_distance([point.x(), point.y()], max_distance_2)
            .map(|indexed| Candidate {
                street: indexed.street,
                segment_id: self.segment_ids[indexed.street],
                distance: line_distance(&point, &indexed.line),
            })
            .collect()
    }
}

impl StreetQuery for StreetIndex {
    fn candidates_within(&self, point: Point<f64>, radius: f64) -> Vec<Candidate> {
        let mut candidates = self.within_squared(point, radius * radius);
        candidates.retain(|c| c.distance < radius);
        candidates
    }

    fn nearest(&self, point: Point<f64>) -> Option<Candidate> {
        let query = [point.x(), point.y()];
        let closest = self.tree.nearest_neighbor(&query)?;

        // Gather every line at exactly the nearest distance so ties resolve
        // by segment id rather than by tree layout
        let ties = self.within_squared(point, closest.distance_2(&query));
        resolve_nearest(&ties).or_else(|| {
            Some(Candidate {
                street: closest.street,
                segment_id: self.segment_ids[closest.street],
                distance: line_distance(&point, &closest.line),
            })
        })
    }

    fn street_count(&self) -> usize {
        self.segment_ids.len()
    }
}

/// All-pairs scan over the network.
///
/// Reference semantics for [`StreetIndex`]; quadratic over a batch.
pub struct LinearScan<'a> {
    streets: &'a [BlockStreet],
}

impl<'a> LinearScan<'a> {
    pub fn new(streets: &'a [BlockStreet]) -> Self {
        Self { streets }
    }

    fn all(&self, point: Point<f64>) -> impl Iterator<Item = Candidate> + '_ {
        self.streets
            .iter()
            .enumerate()
            .map(move |(street, s)| Candidate {
                street,
                segment_id: s.segment_id,
                distance: street_distance(&point, &s.geometry),
            })
            .filter(|c| c.distance.is_finite())
    }
}

impl StreetQuery for LinearScan<'_> {
    fn candidates_within(&self, point: Point<f64>, radius: f64) -> Vec<Candidate> {
        self.all(point).filter(|c| c.distance < radius).collect()
    }

    fn nearest(&self, point: Point<f64>) -> Option<Candidate> {
        let all: Vec<Candidate> = self.all(point).collect();
        resolve_nearest(&all)
    }

    fn street_count(&self) -> usize {
        self.streets.len()
    }
}
