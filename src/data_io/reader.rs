use crate::math::bilinear::{self, BilinearWeights};
use crate::math::interpolate::InterpolationError;
use crate::time_utils::days_of_year;
use chrono::NaiveDate;
use log::debug;
use ndarray::{Array2, Array3, Axis};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Offset between Kelvin and degrees Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("Data conversion error: {0}")]
    ConversionError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No meteorological files to read")]
    NoFiles,

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// Origin of the gridded meteorology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetSource {
    /// ERA5 reanalysis, one file per month on a regular lat/lon grid
    Era5,
    /// WRF output, one file per day on a curvilinear grid
    Wrf,
}

impl MetSource {
    pub fn temperature_variable(&self) -> &'static str {
        match self {
            MetSource::Era5 => "t2m",
            MetSource::Wrf => "T2",
        }
    }

    pub fn radiation_variable(&self) -> &'static str {
        match self {
            MetSource::Era5 => "ssrd",
            MetSource::Wrf => "SWDOWN",
        }
    }

    /// ERA5 radiation is accumulated over the preceding hour (J/m²)
    pub fn radiation_divisor(&self) -> f64 {
        match self {
            MetSource::Era5 => 3600.0,
            MetSource::Wrf => 1.0,
        }
    }

    fn coordinate_variables(&self) -> (&'static str, &'static str) {
        match self {
            MetSource::Era5 => ("latitude", "longitude"),
            MetSource::Wrf => ("XLAT", "XLONG"),
        }
    }
}

/// Monthly ERA5 file name, e.g. `ERA5_03_2015.nc`
pub fn era5_filename(base_path: &Path, year: i32, month: u32) -> PathBuf {
    base_path.join(format!("ERA5_{:02}_{}.nc", month, year))
}

/// Daily WRF file name, e.g. `wrfout_d01_2015-03-01_00:00:00`
pub fn wrf_filename(base_path: &Path, domain: u32, date: &NaiveDate) -> PathBuf {
    base_path.join(format!(
        "wrfout_d{:02}_{}_00:00:00",
        domain,
        date.format("%Y-%m-%d")
    ))
}

/// Horizontal coordinates of a meteorological grid
#[derive(Debug, Clone, PartialEq)]
pub enum GridCoordinates {
    /// Ascending 1-D latitude and longitude axes
    Regular { lats: Vec<f64>, lons: Vec<f64> },
    /// 2-D latitude/longitude per grid point, `[south_north, west_east]`
    Curvilinear { lats: Array2<f64>, lons: Array2<f64> },
}

impl GridCoordinates {
    /// Bilinear weights for a station.
    ///
    /// A curvilinear grid is reduced to the latitude column and longitude
    /// row through the grid point nearest to the station (smallest
    /// `|dlat| + |dlon|`, first match on ties).
    pub fn locate(&self, lat: f64, lon: f64) -> Result<BilinearWeights, ReaderError> {
        match self {
            GridCoordinates::Regular { lats, lons } => Ok(bilinear::locate(lat, lon, lats, lons)?),
            GridCoordinates::Curvilinear { lats, lons } => {
                let mut nearest = (0, 0);
                let mut best = f64::INFINITY;
                for ((j, i), &grid_lat) in lats.indexed_iter() {
                    let dist = (lat - grid_lat).abs() + (lon - lons[[j, i]]).abs();
                    if dist < best {
                        best = dist;
                        nearest = (j, i);
                    }
                }
                let (j, i) = nearest;
                let lat_axis = lats.column(i).to_vec();
                let lon_axis = lons.row(j).to_vec();
                Ok(bilinear::locate(lat, lon, &lat_axis, &lon_axis)?)
            }
        }
    }
}

/// One meteorological file reduced to the fields the model needs.
///
/// Latitude ascends along axis 1 of both fields; temperature is in °C and
/// radiation in W/m², each shaped `[time, lat, lon]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSnapshot {
    pub coordinates: GridCoordinates,
    pub temperature: Array3<f64>,
    pub radiation: Array3<f64>,
}

fn dimension_lengths(var: &netcdf::Variable) -> Vec<usize> {
    var.dimensions().iter().map(|d| d.len()).collect()
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Result<Option<f64>, ReaderError> {
    match var.attribute_value(name) {
        None => Ok(None),
        Some(value) => match value? {
            netcdf::AttributeValue::Double(v) => Ok(Some(v)),
            netcdf::AttributeValue::Float(v) => Ok(Some(v as f64)),
            other => Err(ReaderError::ConversionError(format!(
                "attribute {} has unsupported type {:?}",
                name, other
            ))),
        },
    }
}

/// Read a variable as f64, unpacking `scale_factor` / `add_offset`
fn read_values(file: &netcdf::File, name: &str) -> Result<(Vec<f64>, Vec<usize>), ReaderError> {
    let var = file
        .variable(name)
        .ok_or_else(|| ReaderError::MissingVariable(name.to_string()))?;

    let mut values: Vec<f64> = var.get_values(..)?;
    let scale = numeric_attribute(&var, "scale_factor")?;
    let offset = numeric_attribute(&var, "add_offset")?;
    if scale.is_some() || offset.is_some() {
        let (scale, offset) = (scale.unwrap_or(1.0), offset.unwrap_or(0.0));
        values.iter_mut().for_each(|v| *v = *v * scale + offset);
    }

    Ok((values, dimension_lengths(&var)))
}

/// Read a `[time, lat, lon]` field; a 2-D field gains a time axis of one
fn read_field(file: &netcdf::File, name: &str) -> Result<Array3<f64>, ReaderError> {
    let (values, shape) = read_values(file, name)?;
    let shape = match shape.as_slice() {
        &[nt, ny, nx] => (nt, ny, nx),
        &[ny, nx] => (1, ny, nx),
        other => {
            return Err(ReaderError::ConversionError(format!(
                "{} has shape {:?}, expected 2 or 3 dimensions",
                name, other
            )))
        }
    };
    Array3::from_shape_vec(shape, values)
        .map_err(|e| ReaderError::ConversionError(format!("{}: {}", name, e)))
}

fn read_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>, ReaderError> {
    let (values, shape) = read_values(file, name)?;
    if shape.len() != 1 {
        return Err(ReaderError::ConversionError(format!(
            "{} has shape {:?}, expected a 1-D axis",
            name, shape
        )));
    }
    Ok(values)
}

/// Read 2-D coordinates, taking the first time slice of 3-D ones
fn read_coordinate_grid(file: &netcdf::File, name: &str) -> Result<Array2<f64>, ReaderError> {
    let field = read_field(file, name)?;
    Ok(field.index_axis(Axis(0), 0).to_owned())
}

/// Reverse the latitude axis of a north-to-south grid
fn ascending_latitudes(
    mut lats: Vec<f64>,
    mut fields: [&mut Array3<f64>; 2],
) -> Vec<f64> {
    if lats.len() > 1 && lats[0] > lats[lats.len() - 1] {
        lats.reverse();
        for field in fields.iter_mut() {
            field.invert_axis(Axis(1));
        }
    }
    lats
}

/// Build a snapshot from an open file. Conversion to °C and W/m² happens
/// here so every later stage works in model units.
pub fn read_snapshot_from(
    file: &netcdf::File,
    source: MetSource,
) -> Result<GridSnapshot, ReaderError> {
    let mut temperature = read_field(file, source.temperature_variable())?;
    let mut radiation = read_field(file, source.radiation_variable())?;
    temperature.mapv_inplace(|t| t - KELVIN_OFFSET);
    let divisor = source.radiation_divisor();
    radiation.mapv_inplace(|r| r / divisor);

    let (lat_name, lon_name) = source.coordinate_variables();
    let coordinates = match source {
        MetSource::Era5 => {
            let lats = read_axis(file, lat_name)?;
            let lons = read_axis(file, lon_name)?;
            let lats = ascending_latitudes(lats, [&mut temperature, &mut radiation]);
            GridCoordinates::Regular { lats, lons }
        }
        MetSource::Wrf => GridCoordinates::Curvilinear {
            lats: read_coordinate_grid(file, lat_name)?,
            lons: read_coordinate_grid(file, lon_name)?,
        },
    };

    if temperature.dim() != radiation.dim() {
        return Err(ReaderError::ConversionError(format!(
            "temperature {:?} and radiation {:?} differ in shape",
            temperature.dim(),
            radiation.dim()
        )));
    }

    Ok(GridSnapshot {
        coordinates,
        temperature,
        radiation,
    })
}

/// Hourly temperature (°C) and radiation (W/m²) at one station
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetSeries {
    pub temperature: Vec<f64>,
    pub radiation: Vec<f64>,
}

impl MetSeries {
    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }

    /// Append the station values of every time step in `snapshot`
    pub fn append(
        &mut self,
        snapshot: &GridSnapshot,
        weights: &BilinearWeights,
    ) -> Result<(), ReaderError> {
        let temperature = bilinear::apply_series(&snapshot.temperature.view(), weights)?;
        let radiation = bilinear::apply_series(&snapshot.radiation.view(), weights)?;
        self.temperature.extend(temperature.iter());
        self.radiation.extend(radiation.iter());
        Ok(())
    }
}

/// Concatenate the station series over a sequence of snapshots.
///
/// Weights come from the first snapshot and are reused for the rest, so all
/// snapshots must share one grid.
pub fn extract_point_series<I>(snapshots: I, lat: f64, lon: f64) -> Result<MetSeries, ReaderError>
where
    I: IntoIterator<Item = Result<GridSnapshot, ReaderError>>,
{
    let mut weights: Option<BilinearWeights> = None;
    let mut series = MetSeries::default();

    for snapshot in snapshots {
        let snapshot = snapshot?;
        let w = match weights {
            Some(w) => w,
            None => {
                let w = snapshot.coordinates.locate(lat, lon)?;
                debug!(
                    "Grid cell for ({}, {}): isw={} jsw={} weights ne={:.4} nw={:.4} se={:.4} sw={:.4}",
                    lat, lon, w.isw, w.jsw, w.ne, w.nw, w.se, w.sw
                );
                weights = Some(w);
                w
            }
        };
        series.append(&snapshot, &w)?;
    }

    if weights.is_none() {
        return Err(ReaderError::NoFiles);
    }
    Ok(series)
}

/// Reads one year of gridded meteorology from a directory of NetCDF files
#[derive(Debug, Clone)]
pub struct MetReader {
    pub source: MetSource,
    pub base_path: PathBuf,
    pub year: i32,
    pub wrf_domain: u32,
}

impl MetReader {
    pub fn new(source: MetSource, base_path: impl AsRef<Path>, year: i32, wrf_domain: u32) -> Self {
        Self {
            source,
            base_path: base_path.as_ref().to_path_buf(),
            year,
            wrf_domain,
        }
    }

    /// Files of the run year in chronological order
    pub fn file_paths(&self) -> Vec<PathBuf> {
        match self.source {
            MetSource::Era5 => (1..=12)
                .map(|month| era5_filename(&self.base_path, self.year, month))
                .collect(),
            MetSource::Wrf => days_of_year(self.year)
                .iter()
                .map(|date| wrf_filename(&self.base_path, self.wrf_domain, date))
                .collect(),
        }
    }

    /// Open, read and close one file
    pub fn read_snapshot(&self, path: &Path) -> Result<GridSnapshot, ReaderError> {
        if !path.exists() {
            return Err(ReaderError::FileNotFound(path.display().to_string()));
        }
        debug!("Reading {}", path.display());
        let file = netcdf::open(path)?;
        read_snapshot_from(&file, self.source)
    }

    /// Hourly station series over the whole year; files are opened one at
    /// a time and closed before the next is read
    pub fn station_series(&self, lat: f64, lon: f64) -> Result<MetSeries, ReaderError> {
        let paths = self.file_paths();
        extract_point_series(paths.iter().map(|p| self.read_snapshot(p)), lat, lon)
    }
}
