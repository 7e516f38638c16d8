use crate::model::vegetation::VegetationClass;
use log::info;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown IGBP land-cover code '{code}' for station {station}")]
    UnknownIgbp { station: String, code: String },
}

/// A flux-tower site with its vegetation class resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// MODIS sinusoidal tile (h, v)
    pub tile: (u32, u32),
    pub vegetation: VegetationClass,
}

/// One row of the station table. The IGBP code stays raw until the station
/// is known to have observations.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub tile: (u32, u32),
    pub igbp: String,
}

#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "Station")]
    station: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    tile_h: u32,
    tile_v: u32,
    #[serde(rename = "IGBP")]
    igbp: String,
}

impl From<StationRow> for StationRecord {
    fn from(row: StationRow) -> Self {
        StationRecord {
            name: row.station,
            latitude: row.latitude,
            longitude: row.longitude,
            tile: (row.tile_h, row.tile_v),
            igbp: row.igbp,
        }
    }
}

impl TryFrom<StationRecord> for Station {
    type Error = StationError;

    fn try_from(record: StationRecord) -> Result<Self, Self::Error> {
        let vegetation = VegetationClass::from_igbp(&record.igbp).ok_or_else(|| {
            StationError::UnknownIgbp {
                station: record.name.clone(),
                code: record.igbp.clone(),
            }
        })?;
        Ok(Station {
            name: record.name,
            latitude: record.latitude,
            longitude: record.longitude,
            tile: record.tile,
            vegetation,
        })
    }
}

/// Read the station table (`Station,Latitude,Longitude,tile_h,tile_v,IGBP`).
/// Rows repeating an earlier station name are ignored.
pub fn read_station_table(path: impl AsRef<Path>) -> Result<Vec<StationRecord>, StationError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    parse_station_table(reader)
}

pub fn parse_station_table<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<StationRecord>, StationError> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: StationRow = row?;
        if seen.insert(row.station.clone()) {
            records.push(StationRecord::from(row));
        }
    }
    Ok(records)
}

/// Map the IGBP code of every record. A code without a VPRM class fails
/// the whole set.
pub fn resolve_stations(records: Vec<StationRecord>) -> Result<Vec<Station>, StationError> {
    records.into_iter().map(Station::try_from).collect()
}

/// True when any of `file_names` contains both the station name and the year
pub fn has_observations(file_names: &[String], station: &str, year: i32) -> bool {
    let year = year.to_string();
    file_names
        .iter()
        .any(|name| name.contains(station) && name.contains(&year))
}

/// Names of the entries in `data_dir`
pub fn list_file_names(data_dir: &Path) -> Result<Vec<String>, StationError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Drop stations without observation files for `year`, before any
/// per-station work is done
pub fn retain_observed(
    stations: Vec<StationRecord>,
    data_dir: impl AsRef<Path>,
    year: i32,
) -> Result<Vec<StationRecord>, StationError> {
    let file_names = list_file_names(data_dir.as_ref())?;
    let (kept, dropped): (Vec<_>, Vec<_>) = stations
        .into_iter()
        .partition(|s| has_observations(&file_names, &s.name, year));

    for station in &dropped {
        info!("No observations for {} in {}, station excluded", station.name, year);
    }
    Ok(kept)
}
