//! Aggregates raw street segments into block-level streets.
//!
//! Raw centerline segments are grouped by street name and hundred block
//! (`floor(start_address / 100) * 100`). Every group becomes one
//! `BlockStreet` with a multi-line geometry holding all constituent lines and
//! the summed network length.

use std::collections::BTreeMap;

use geo::{LineString, MultiLineString};
use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::error::NetworkError;
use crate::models::{BlockKey, BlockStreet, Centerline, NetworkSegment, StreetSegment};

/// Round a start address down to its hundred block
pub fn block_number(start_address: f64) -> i64 {
    (start_address / 100.0).floor() as i64 * 100
}

/// Attach centerline attributes to network segments by segment id.
///
/// Left join: every network segment yields one `StreetSegment`. Segments with
/// no centerline row get no street name and are dropped later by
/// [`build_block_streets`].
pub fn join_layers(
    network: Vec<NetworkSegment>,
    centerlines: &[Centerline],
) -> Vec<StreetSegment> {
    let mut by_id: HashMap<i64, &Centerline> = HashMap::with_capacity(centerlines.len());
    for centerline in centerlines {
        by_id.entry(centerline.segment_id).or_insert(centerline);
    }

    let mut unmatched = 0usize;
    let segments: Vec<StreetSegment> = network
        .into_iter()
        .map(|segment| {
            let (street_name, start_address) = match by_id.get(&segment.segment_id) {
                Some(c) => (c.street_name.clone(), c.start_address),
                None => {
                    unmatched += 1;
                    (None, 0.0)
                }
            };
            StreetSegment {
                segment_id: segment.segment_id,
                geometry: segment.geometry,
                street_name,
                start_address,
                length: segment.length,
            }
        })
        .collect();

    if unmatched > 0 {
        debug!("{} network segments have no centerline attributes", unmatched);
    }

    segments
}

#[derive(Default)]
struct BlockGroup {
    lines: Vec<(i64, LineString<f64>, f64)>,
}

/// Group street segments into block-level streets.
///
/// Output is ordered by (street name, block number) and synthetic segment ids
/// are assigned densely in that order, so the same set of input segments
/// always produces the same ids whatever order they arrive in.
pub fn build_block_streets(segments: Vec<StreetSegment>) -> Result<Vec<BlockStreet>, NetworkError> {
    let total = segments.len();
    let mut unnamed = 0usize;
    let mut groups: BTreeMap<BlockKey, BlockGroup> = BTreeMap::new();

    for segment in segments {
        let Some(name) = segment.name() else {
            unnamed += 1;
            continue;
        };

        if !segment.start_address.is_finite() || segment.start_address < 0.0 {
            return Err(NetworkError::InvalidStartAddress {
                segment_id: segment.segment_id,
                value: segment.start_address,
            });
        }

        // A line needs two coordinates to have a distance to anything
        if segment.geometry.0.len() < 2 {
            warn!(
                "Skipping segment {} with degenerate geometry ({} coordinates)",
                segment.segment_id,
                segment.geometry.0.len()
            );
            continue;
        }

        let key = BlockKey {
            street_name: name.to_string(),
            block_number: block_number(segment.start_address),
        };
        groups.entry(key).or_default().lines.push((
            segment.segment_id,
            segment.geometry,
            segment.length,
        ));
    }

    let streets: Vec<BlockStreet> = groups
        .into_iter()
        .enumerate()
        .map(|(index, (key, mut group))| {
            // Stable sort keeps input order for repeated raw ids
            group.lines.sort_by_key(|(id, _, _)| *id);
            let length = group.lines.iter().map(|(_, _, len)| len).sum();
            let lines = group.lines.into_iter().map(|(_, line, _)| line).collect();

            BlockStreet {
                segment_id: index as u32,
                street_name: key.street_name,
                block_number: key.block_number,
                geometry: MultiLineString::new(lines),
                length,
            }
        })
        .collect();

    info!(
        "Aggregated {} street segments into {} block streets ({} without a street name)",
        total,
        streets.len(),
        unnamed
    );

    Ok(streets)
}
