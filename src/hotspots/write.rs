//! Writers for enriched incidents and the block streets layer.

use anyhow::{Context, Result};
use csv::{StringRecord, WriterBuilder};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

use streetblock::hotspot::{format_segment_id, Enriched};
use streetblock::models::BlockStreet;

use crate::load::IncidentRow;

/// Street columns appended to every incident row
pub const OUTPUT_COLUMNS: [&str; 4] = ["segment_id", "street_name", "block_number", "length"];

/// Write incidents with their street columns.
///
/// Unassigned rows get empty strings in all four columns.
pub fn write_enriched_csv(
    path: &Path,
    headers: &StringRecord,
    rows: &[Enriched<IncidentRow>],
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);

    let mut header = headers.clone();
    for column in OUTPUT_COLUMNS {
        header.push_field(column);
    }
    writer.write_record(&header)?;

    for row in rows {
        let mut record = row.record.fields.clone();
        let street = &row.street;
        record.push_field(&street.segment_id_string());
        record.push_field(street.street_name.as_deref().unwrap_or(""));
        record.push_field(&street.block_number.map(|b| b.to_string()).unwrap_or_default());
        record.push_field(&street.length.map(|l| l.to_string()).unwrap_or_default());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn street_feature(street: &BlockStreet) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(
        "segment_id".to_string(),
        json!(format_segment_id(Some(street.segment_id))),
    );
    properties.insert("street_name".to_string(), json!(street.street_name));
    properties.insert("block_number".to_string(), json!(street.block_number));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&street.geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Write the block streets as a GeoJSON FeatureCollection
pub fn write_streets_geojson(path: &Path, streets: &[BlockStreet]) -> Result<()> {
    let collection = FeatureCollection {
        bbox: None,
        features: streets.iter().map(street_feature).collect(),
        foreign_members: None,
    };

    fs::write(path, collection.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} block streets to {}", streets.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, MultiLineString, Point};
    use geojson::GeoJson;
    use streetblock::hotspot::StreetAttributes;
    use streetblock::models::IncidentId;

    fn row(id: i64, fields: Vec<&str>) -> IncidentRow {
        IncidentRow {
            id: IncidentId::Number(id),
            location: Some(Point::new(0.0, 0.0)),
            fields: StringRecord::from(fields),
        }
    }

    #[test]
    fn test_write_enriched_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let rows = vec![
            Enriched {
                record: row(1, vec!["1", "0", "0"]),
                street: StreetAttributes {
                    segment_id: Some(0),
                    street_name: Some("MAIN ST".into()),
                    block_number: Some(1200),
                    length: Some(350.5),
                },
            },
            Enriched {
                record: row(2, vec!["2", "", ""]),
                street: StreetAttributes::default(),
            },
        ];

        write_enriched_csv(&path, &StringRecord::from(vec!["cartodb_id", "x", "y"]), &rows)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "cartodb_id,x,y,segment_id,street_name,block_number,length");
        assert_eq!(lines[1], "1,0,0,0,MAIN ST,1200,350.5");
        assert_eq!(lines[2], "2,,,,,,");
    }

    #[test]
    fn test_write_streets_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streets.geojson");

        let streets = vec![BlockStreet {
            segment_id: 7,
            street_name: "ELM ST".into(),
            block_number: 300,
            geometry: MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]]),
            length: 1.4,
        }];
        write_streets_geojson(&path, &streets).unwrap();

        let geojson: GeoJson = fs::read_to_string(&path).unwrap().parse().unwrap();
        let collection = FeatureCollection::try_from(geojson).unwrap();
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(feature.property("segment_id"), Some(&json!("7")));
        assert_eq!(feature.property("street_name"), Some(&json!("ELM ST")));
        assert_eq!(feature.property("block_number"), Some(&json!(300)));
        assert!(matches!(
            feature.geometry.as_ref().map(|g| &g.value),
            Some(Value::MultiLineString(_))
        ));
    }
}
