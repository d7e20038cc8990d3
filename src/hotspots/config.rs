use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use streetblock::hotspot::{DEFAULT_BUFFER_DISTANCE, LONG_SEGMENT_THRESHOLD};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub matching: MatchingConfig,
    pub network: NetworkLayerConfig,
    pub centerlines: CenterlineLayerConfig,
    pub incidents: IncidentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub buffer_distance: f64,
    pub max_segment_length: f64,
    pub parallel: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            buffer_distance: DEFAULT_BUFFER_DISTANCE,
            max_segment_length: LONG_SEGMENT_THRESHOLD,
            parallel: false,
        }
    }
}

/// Street network layer: geometry, segment id and length
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkLayerConfig {
    pub path: Option<PathBuf>,
    pub segment_id_field: String,
    pub length_field: String,
}

impl Default for NetworkLayerConfig {
    fn default() -> Self {
        Self {
            path: None,
            segment_id_field: "SEG_ID".to_string(),
            length_field: "LENGTH".to_string(),
        }
    }
}

/// Centerline layer: street names and address ranges
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CenterlineLayerConfig {
    pub path: Option<PathBuf>,
    pub segment_id_field: String,
    pub street_name_field: String,
    pub start_address_field: String,
}

impl Default for CenterlineLayerConfig {
    fn default() -> Self {
        Self {
            path: None,
            segment_id_field: "SEG_ID".to_string(),
            street_name_field: "STNAME".to_string(),
            start_address_field: "L_F_ADD".to_string(),
        }
    }
}

/// Incident CSV columns; coordinates are in the network's projected CRS
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IncidentConfig {
    pub id_field: String,
    pub x_field: String,
    pub y_field: String,
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            id_field: "cartodb_id".to_string(),
            x_field: "x".to_string(),
            y_field: "y".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
