//! Readers for the street layers and incident tables.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use geo::{Euclidean, Geometry, Length, LineString, Point};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use streetblock::models::{Centerline, IncidentId, Located, NetworkSegment};

use crate::config::{CenterlineLayerConfig, IncidentConfig, NetworkLayerConfig};
use crate::write::OUTPUT_COLUMNS;

/// Open a file, decompressing `.gz` transparently
pub fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let mut content = String::new();
    open_reader(path)?
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON in {}", path.display()))?;
    FeatureCollection::try_from(geojson)
        .with_context(|| format!("{} is not a FeatureCollection", path.display()))
}

/// Numeric property, accepting numbers or numeric strings
fn number_property(feature: &Feature, field: &str) -> Option<f64> {
    match feature.property(field)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_property(feature: &Feature, field: &str) -> Option<String> {
    match feature.property(field)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

fn segment_id(feature: &Feature, field: &str) -> Option<i64> {
    number_property(feature, field).map(|id| id as i64)
}

/// Lines of a feature's geometry; non-linear geometries yield nothing
fn feature_lines(feature: &Feature) -> Result<Vec<LineString<f64>>> {
    let Some(geometry) = feature.geometry.clone() else {
        return Ok(vec![]);
    };
    let geometry: Geometry<f64> = geometry.try_into()?;
    Ok(match geometry {
        Geometry::LineString(line) => vec![line],
        Geometry::MultiLineString(lines) => lines.0,
        Geometry::Line(line) => vec![line.into()],
        _ => vec![],
    })
}

/// Load the street network layer.
///
/// Multi-part features become one segment per part, sharing the segment id,
/// with the feature length split in proportion to each part's length.
pub fn load_network(path: &Path, config: &NetworkLayerConfig) -> Result<Vec<NetworkSegment>> {
    info!("Loading street network from {}", path.display());
    let collection = read_feature_collection(path)?;

    let mut segments = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in &collection.features {
        let Some(id) = segment_id(feature, &config.segment_id_field) else {
            skipped += 1;
            continue;
        };
        let lines = feature_lines(feature)
            .with_context(|| format!("Invalid geometry for segment {}", id))?;
        if lines.is_empty() {
            skipped += 1;
            continue;
        }

        let length = number_property(feature, &config.length_field).unwrap_or(0.0);
        let total: f64 = lines.iter().map(|l| Euclidean.length(l)).sum();
        let parts = lines.len() as f64;

        for line in lines {
            let share = if total > 0.0 {
                Euclidean.length(&line) / total
            } else {
                1.0 / parts
            };
            segments.push(NetworkSegment {
                segment_id: id,
                geometry: line,
                length: length * share,
            });
        }
    }

    if skipped > 0 {
        warn!("Skipped {} network features without an id or line geometry", skipped);
    }
    info!("Loaded {} network segments", segments.len());

    Ok(segments)
}

/// Load the centerline attribute layer (geometry is ignored)
pub fn load_centerlines(path: &Path, config: &CenterlineLayerConfig) -> Result<Vec<Centerline>> {
    info!("Loading centerlines from {}", path.display());
    let collection = read_feature_collection(path)?;

    let mut centerlines = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let Some(id) = segment_id(feature, &config.segment_id_field) else {
            continue;
        };
        let Some(start_address) = number_property(feature, &config.start_address_field) else {
            warn!("Centerline {} has no {}", id, config.start_address_field);
            continue;
        };
        centerlines.push(Centerline {
            segment_id: id,
            street_name: text_property(feature, &config.street_name_field),
            start_address,
        });
    }

    info!("Loaded {} centerlines", centerlines.len());
    Ok(centerlines)
}

/// A row of the incident table, other columns carried through untouched
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentRow {
    pub id: IncidentId,
    pub location: Option<Point<f64>>,
    pub fields: StringRecord,
}

impl Located for IncidentRow {
    fn id(&self) -> &IncidentId {
        &self.id
    }

    fn location(&self) -> Option<Point<f64>> {
        self.location
    }
}

/// Incident table with the columns written back out
#[derive(Debug)]
pub struct IncidentTable {
    pub headers: StringRecord,
    pub rows: Vec<IncidentRow>,
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("Column '{}' not found", name))
}

fn coordinate(record: &StringRecord, index: usize) -> Option<f64> {
    record
        .get(index)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Load incidents from CSV.
///
/// Blank or unparsable coordinates mean an empty geometry. Street columns
/// left over from a previous run are dropped so the output is rebuilt from
/// the original columns.
pub fn load_incidents(path: &Path, config: &IncidentConfig) -> Result<IncidentTable> {
    info!("Loading incidents from {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_reader(path)?);
    let all_headers = reader.headers()?.clone();

    let keep: Vec<usize> = all_headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !OUTPUT_COLUMNS.contains(h))
        .map(|(i, _)| i)
        .collect();
    if keep.len() < all_headers.len() {
        warn!("Dropping existing street columns from {}", path.display());
    }
    let headers: StringRecord = keep.iter().map(|&i| &all_headers[i]).collect();

    let id_idx = column(&headers, &config.id_field)?;
    let x_idx = column(&headers, &config.x_field)?;
    let y_idx = column(&headers, &config.y_field)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {}", line + 1))?;
        let fields: StringRecord = keep.iter().map(|&i| record.get(i).unwrap_or("")).collect();

        let raw_id = fields.get(id_idx).unwrap_or("");
        if raw_id.trim().is_empty() {
            bail!("Row {} has an empty '{}'", line + 1, config.id_field);
        }

        let location = match (coordinate(&fields, x_idx), coordinate(&fields, y_idx)) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };

        rows.push(IncidentRow {
            id: IncidentId::parse(raw_id),
            location,
            fields,
        });
    }

    info!(
        "Loaded {} incidents ({} without coordinates)",
        rows.len(),
        rows.iter().filter(|r| r.location.is_none()).count()
    );

    Ok(IncidentTable { headers, rows })
}
