use crate::{
    config::{ConfigError, RunConfig},
    data_io::{
        reader::{MetReader, MetSeries, ReaderError},
        stations::{
            read_station_table, resolve_stations, retain_observed, Station, StationError,
            StationRecord,
        },
        writer::{output_path, FluxTable, WriteError},
    },
    math::interpolate::{resample, InterpolationError},
    model::{
        flux::{compute_fluxes, FluxSeries},
        scalars::compute_scalars,
        vegetation::{ParameterError, VprmParameters},
        FluxError,
    },
    modis::{preprocess, CsvModisSource, ModisError, ModisSource},
    time_utils::{half_hourly_grid, hourly_times, is_leap_year},
};
use log::{info, warn};
use ndarray::Array1;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Meteorology error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Station table error: {0}")]
    Station(#[from] StationError),

    #[error("Parameter table error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("MODIS error: {0}")]
    Modis(#[from] ModisError),

    #[error("Flux error: {0}")]
    Flux(#[from] FluxError),

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Output error: {0}")]
    Write(#[from] WriteError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Station {station}: {source}")]
    AtStation {
        station: String,
        #[source]
        source: Box<PipelineError>,
    },
}

/// Hourly meteorology at a station
pub trait MeteorologySource: Sync {
    fn point_series(&self, station: &Station) -> Result<MetSeries, ReaderError>;
}

impl MeteorologySource for MetReader {
    fn point_series(&self, station: &Station) -> Result<MetSeries, ReaderError> {
        self.station_series(station.latitude, station.longitude)
    }
}

/// Finished fluxes of one station on the half-hourly grid
#[derive(Debug, Clone, PartialEq)]
pub struct StationFluxes {
    pub station: String,
    pub fluxes: FluxSeries,
}

/// Place hourly samples at `julian(year,1,1) + k/24` and resample them to
/// the half-hourly grid
fn to_half_hourly(year: i32, hourly: &[f64], grid: &[f64]) -> Result<Array1<f64>, InterpolationError> {
    let times = hourly_times(year, hourly.len());
    Ok(Array1::from(resample(&times, hourly, grid)?))
}

/// Run the model for one station
pub fn compute_station_fluxes<M, T>(
    year: i32,
    params: &VprmParameters,
    station: &Station,
    modis: &M,
    met: &T,
) -> Result<StationFluxes, PipelineError>
where
    M: ModisSource + ?Sized,
    T: MeteorologySource + ?Sized,
{
    info!(
        "Processing {} ({}, {:.4}, {:.4})",
        station.name, station.vegetation, station.latitude, station.longitude
    );

    let point = modis.point_series(year, station)?;
    let indices = preprocess(year, &point, &station.name)?;

    let met_series = met.point_series(station)?;
    let grid = half_hourly_grid(year);
    let temp = to_half_hourly(year, &met_series.temperature, &grid)?;
    let rad = to_half_hourly(year, &met_series.radiation, &grid)?;

    let class = station.vegetation;
    let class_params = params.get(class);
    let scalars = compute_scalars(
        class,
        class_params,
        &temp.view(),
        &indices.evi.view(),
        &indices.lswi.view(),
        &indices.bounds,
    )?;
    let fluxes = compute_fluxes(
        class_params,
        &scalars,
        &temp.view(),
        &indices.evi.view(),
        &rad.view(),
    )?;

    Ok(StationFluxes {
        station: station.name.clone(),
        fluxes,
    })
}

/// Process every station, in parallel on a pool of `num_threads` when
/// `parallel` is set. Results keep the order of `stations`.
pub fn process_stations<M, T>(
    year: i32,
    params: &VprmParameters,
    stations: &[Station],
    modis: &M,
    met: &T,
    parallel: bool,
    num_threads: usize,
) -> Result<Vec<StationFluxes>, PipelineError>
where
    M: ModisSource + Sync + ?Sized,
    T: MeteorologySource + ?Sized,
{
    let run_one = |station: &Station| {
        compute_station_fluxes(year, params, station, modis, met).map_err(|e| {
            PipelineError::AtStation {
                station: station.name.clone(),
                source: Box::new(e),
            }
        })
    };

    if parallel {
        info!(
            "Computing {} stations in parallel using {} threads",
            stations.len(),
            num_threads
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        pool.install(|| stations.par_iter().map(run_one).collect())
    } else {
        stations.iter().map(run_one).collect()
    }
}

/// Merge station results into the output table
pub fn build_table(year: i32, results: &[StationFluxes]) -> Result<FluxTable, WriteError> {
    let mut table = FluxTable::new(half_hourly_grid(year));
    for result in results {
        table.add_station(&result.station, &result.fluxes)?;
    }
    Ok(table)
}

/// Filter, compute and write with the given data sources. Returns the path
/// of the written table. Vegetation classes are resolved only for stations
/// that have observations.
pub fn run_with_sources<M, T>(
    config: &RunConfig,
    params: &VprmParameters,
    records: Vec<StationRecord>,
    modis: &M,
    met: &T,
) -> Result<PathBuf, PipelineError>
where
    M: ModisSource + Sync + ?Sized,
    T: MeteorologySource + ?Sized,
{
    let start = Instant::now();
    if is_leap_year(config.year) {
        warn!(
            "{} is a leap year; the output grid covers 365 days and 31 December is not modelled",
            config.year
        );
    }
    let total = records.len();
    let observed = retain_observed(records, &config.station_data_dir, config.year)?;
    let stations = resolve_stations(observed)?;
    info!("{} of {} stations have observations in {}", stations.len(), total, config.year);
    if stations.is_empty() {
        warn!("No stations to process, the output will only hold the time axis");
    }

    let results = process_stations(
        config.year,
        params,
        &stations,
        modis,
        met,
        config.parallel,
        config.num_threads,
    )?;

    let table = build_table(config.year, &results)?;
    let path = output_path(&config.output_dir, &config.tag, config.year);
    table.write_csv(&path)?;

    info!(
        "Finished {} stations in {:.2}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(path)
}

/// Full run from a validated configuration
pub fn run_pipeline(config: &RunConfig) -> Result<PathBuf, PipelineError> {
    let params = VprmParameters::from_csv(&config.parameters_file)?;
    let stations = read_station_table(&config.stations_file)?;
    let modis = CsvModisSource::new(&config.modis_dir);
    let met = MetReader::new(config.met_source, &config.met_dir, config.year, config.wrf_domain);
    run_with_sources(config, &params, stations, &modis, &met)
}
