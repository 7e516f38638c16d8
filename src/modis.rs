//! MODIS vegetation indices at a station: loading and preparation for the
//! half-hourly model grid.

use crate::data_io::stations::Station;
use crate::math::interpolate::{resample, InterpolationError};
use crate::model::scalars::IndexBounds;
use crate::time_utils::{half_hourly_grid, modis_times_to_julian};
use log::{debug, warn};
use ndarray::Array1;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Neutral index value used when a whole series is missing
pub const MISSING_INDEX_FILL: f64 = 0.5;

#[derive(Error, Debug)]
pub enum ModisError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("MODIS file not found: {0}")]
    FileNotFound(String),

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// Raw point series as returned by a MODIS extractor. `times` are day-of-year
/// offsets (1 = 1 January); missing index values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ModisPoint {
    pub times: Vec<f64>,
    pub evi: Vec<f64>,
    pub lswi: Vec<f64>,
}

/// Source of MODIS point series for a station and year
pub trait ModisSource {
    fn point_series(&self, year: i32, station: &Station) -> Result<ModisPoint, ModisError>;
}

/// Reads pre-extracted point series from `<base>/<station>_<year>.csv`
/// with header `time,evi,lswi`
#[derive(Debug, Clone)]
pub struct CsvModisSource {
    pub base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ModisRow {
    time: f64,
    evi: Option<f64>,
    lswi: Option<f64>,
}

impl CsvModisSource {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self, station_name: &str, year: i32) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", station_name, year))
    }
}

impl ModisSource for CsvModisSource {
    fn point_series(&self, year: i32, station: &Station) -> Result<ModisPoint, ModisError> {
        let path = self.file_path(&station.name, year);
        if !path.exists() {
            return Err(ModisError::FileNotFound(path.display().to_string()));
        }
        debug!("Reading MODIS point series from {}", path.display());

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let mut point = ModisPoint {
            times: Vec::new(),
            evi: Vec::new(),
            lswi: Vec::new(),
        };
        for row in reader.deserialize() {
            let row: ModisRow = row?;
            point.times.push(row.time);
            point.evi.push(row.evi.unwrap_or(f64::NAN));
            point.lswi.push(row.lswi.unwrap_or(f64::NAN));
        }
        Ok(point)
    }
}

/// EVI and LSWI on the half-hourly grid with their seasonal extremes
#[derive(Debug, Clone, PartialEq)]
pub struct VegetationIndices {
    pub evi: Array1<f64>,
    pub lswi: Array1<f64>,
    pub bounds: IndexBounds,
}

/// Replace a series with [`MISSING_INDEX_FILL`] when every sample is
/// missing. Returns whether the fill was applied.
pub fn fill_if_all_missing(values: &mut [f64]) -> bool {
    if values.iter().all(|v| v.is_nan()) {
        values.iter_mut().for_each(|v| *v = MISSING_INDEX_FILL);
        true
    } else {
        false
    }
}

/// Shift raw MODIS samples onto absolute Julian days, fill fully missing
/// indices, resample both onto the half-hourly grid of `year` and take the
/// extremes of the resampled series.
pub fn preprocess(
    year: i32,
    point: &ModisPoint,
    station_name: &str,
) -> Result<VegetationIndices, ModisError> {
    let times = modis_times_to_julian(year, &point.times);

    let mut evi = point.evi.clone();
    let mut lswi = point.lswi.clone();
    if fill_if_all_missing(&mut evi) {
        warn!("All EVI missing for {}, using {}", station_name, MISSING_INDEX_FILL);
    }
    if fill_if_all_missing(&mut lswi) {
        warn!("All LSWI missing for {}, using {}", station_name, MISSING_INDEX_FILL);
    }

    let grid = half_hourly_grid(year);
    let evi = Array1::from(resample(&times, &evi, &grid)?);
    let lswi = Array1::from(resample(&times, &lswi, &grid)?);
    let bounds = IndexBounds::from_series(&evi.view(), &lswi.view());

    Ok(VegetationIndices { evi, lswi, bounds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vegetation::VegetationClass;
    use crate::time_utils::HALF_HOURLY_STEPS;
    use std::fs;
    use tempfile::tempdir;

    fn eight_day_point(evi: impl Fn(f64) -> f64, lswi: impl Fn(f64) -> f64) -> ModisPoint {
        let times: Vec<f64> = (0..46).map(|k| 1.0 + 8.0 * k as f64).collect();
        ModisPoint {
            evi: times.iter().map(|&t| evi(t)).collect(),
            lswi: times.iter().map(|&t| lswi(t)).collect(),
            times,
        }
    }

    #[test]
    fn test_fully_missing_series_becomes_neutral() {
        let point = eight_day_point(|_| f64::NAN, |_| f64::NAN);
        let indices = preprocess(2015, &point, "XX-Test").unwrap();
        assert_eq!(indices.evi.len(), HALF_HOURLY_STEPS);
        assert_eq!(indices.lswi.len(), HALF_HOURLY_STEPS);
        assert!(indices.evi.iter().all(|&v| v == 0.5));
        assert!(indices.lswi.iter().all(|&v| v == 0.5));
        assert_eq!(indices.bounds.evi_max, 0.5);
        assert_eq!(indices.bounds.lswi_min, 0.5);
    }

    #[test]
    fn test_only_missing_series_is_filled() {
        let point = eight_day_point(|t| 0.2 + t / 1000.0, |_| f64::NAN);
        let indices = preprocess(2015, &point, "XX-Test").unwrap();
        assert!(indices.lswi.iter().all(|&v| v == 0.5));
        assert!(indices.evi.iter().any(|&v| v != 0.5));
    }

    #[test]
    fn test_bounds_come_from_resampled_series() {
        // Linear ramp sampled every 8 days from day 1 to day 361; the grid
        // runs to day 365 + 47/48 so the maximum is extrapolated
        let point = eight_day_point(|t| t / 1000.0, |t| -0.1 + t / 2000.0);
        let indices = preprocess(2015, &point, "XX-Test").unwrap();

        assert!((indices.evi[0] - 0.001).abs() < 1e-12);
        let last_day = 365.0 + 47.0 / 48.0;
        assert!((indices.bounds.evi_max - last_day / 1000.0).abs() < 1e-9);
        assert!(indices.bounds.evi_max > 0.361);
        assert!((indices.bounds.lswi_min - (-0.1 + 1.0 / 2000.0)).abs() < 1e-12);
    }

    #[test]
    fn test_preprocess_requires_ascending_times() {
        let mut point = eight_day_point(|_| 0.3, |_| 0.1);
        point.times.swap(3, 4);
        assert!(matches!(
            preprocess(2015, &point, "XX-Test"),
            Err(ModisError::Interpolation(InterpolationError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_csv_source_reads_missing_cells_as_nan() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("DE-Hai_2015.csv"),
            "time,evi,lswi\n1,0.31,0.05\n9,,0.07\n17,0.35,NaN\n",
        )
        .unwrap();

        let station = Station {
            name: "DE-Hai".to_string(),
            latitude: 51.08,
            longitude: 10.45,
            tile: (18, 3),
            vegetation: VegetationClass::Deciduous,
        };
        let source = CsvModisSource::new(dir.path());
        let point = source.point_series(2015, &station).unwrap();
        assert_eq!(point.times, vec![1.0, 9.0, 17.0]);
        assert_eq!(point.evi[0], 0.31);
        assert!(point.evi[1].is_nan());
        assert!(point.lswi[2].is_nan());

        assert!(matches!(
            source.point_series(2016, &station),
            Err(ModisError::FileNotFound(_))
        ));
    }
}
