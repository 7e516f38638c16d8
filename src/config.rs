use crate::data_io::reader::MetSource;
use clap::{Arg, ArgAction, ArgMatches};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Path does not exist: {0}")]
    MissingPath(String),

    #[error("Expected a directory: {0}")]
    NotADirectory(String),

    #[error("Expected a file: {0}")]
    NotAFile(String),
}

/// Immutable settings for one model run
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Year to simulate
    pub year: i32,
    /// Gridded meteorology driving the model
    pub met_source: MetSource,
    /// WRF nest number, used in `wrfout_dNN` file names
    pub wrf_domain: u32,

    // Inputs
    /// Station table CSV
    pub stations_file: PathBuf,
    /// Directory holding the flux-tower observation files
    pub station_data_dir: PathBuf,
    /// Directory of ERA5 or WRF NetCDF files
    pub met_dir: PathBuf,
    /// Directory of MODIS point series
    pub modis_dir: PathBuf,
    /// VPRM parameter table CSV
    pub parameters_file: PathBuf,

    // Output
    pub output_dir: PathBuf,
    /// Label in the output file name `VPRM.<tag>_<year>.csv`
    pub tag: String,

    // Execution
    /// Process stations on a rayon pool
    pub parallel: bool,
    /// Size of the rayon pool when `parallel` is set
    pub num_threads: usize,
    /// Log level override (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            year: 2015,
            met_source: MetSource::Era5,
            wrf_domain: 1,
            stations_file: PathBuf::from("./stations.csv"),
            station_data_dir: PathBuf::from("./observations"),
            met_dir: PathBuf::from("./met"),
            modis_dir: PathBuf::from("./modis"),
            parameters_file: PathBuf::from("./vprm_parameters.csv"),
            output_dir: PathBuf::from("./output"),
            tag: default_tag(MetSource::Era5, 1),
            parallel: false,
            num_threads: 4,
            log_level: None,
        }
    }
}

/// Output label when `--tag` is not given
pub fn default_tag(source: MetSource, wrf_domain: u32) -> String {
    match source {
        MetSource::Era5 => "ERA5".to_string(),
        MetSource::Wrf => format!("WRF_d{:02}", wrf_domain),
    }
}

fn parse_number<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T, ConfigError> {
    let raw = matches
        .get_one::<String>(name)
        .ok_or_else(|| ConfigError::InvalidArgument(format!("missing --{}", name)))?;
    raw.parse()
        .map_err(|_| ConfigError::InvalidArgument(format!("--{}: cannot parse '{}'", name, raw)))
}

fn path_arg(matches: &ArgMatches, name: &str) -> Result<PathBuf, ConfigError> {
    matches
        .get_one::<String>(name)
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::InvalidArgument(format!("missing --{}", name)))
}

impl RunConfig {
    /// Arguments of the `run` subcommand
    pub fn args() -> Vec<Arg> {
        vec![
            Arg::new("year")
                .short('y')
                .long("year")
                .value_name("YEAR")
                .help("Year to simulate")
                .required(true),
            Arg::new("met-source")
                .short('m')
                .long("met-source")
                .value_name("SOURCE")
                .help("Meteorological driver")
                .value_parser(["era5", "wrf"])
                .default_value("era5"),
            Arg::new("wrf-domain")
                .long("wrf-domain")
                .value_name("N")
                .help("WRF domain number")
                .default_value("1"),
            Arg::new("stations")
                .short('s')
                .long("stations")
                .value_name("FILE")
                .help("Station table (Station,Latitude,Longitude,tile_h,tile_v,IGBP)")
                .required(true),
            Arg::new("station-data-dir")
                .long("station-data-dir")
                .value_name("DIR")
                .help("Directory of flux-tower observation files")
                .required(true),
            Arg::new("met-dir")
                .long("met-dir")
                .value_name("DIR")
                .help("Directory of ERA5 or WRF NetCDF files")
                .required(true),
            Arg::new("modis-dir")
                .long("modis-dir")
                .value_name("DIR")
                .help("Directory of MODIS point series (<station>_<year>.csv)")
                .required(true),
            Arg::new("parameters")
                .short('p')
                .long("parameters")
                .value_name("FILE")
                .help("VPRM parameter table")
                .required(true),
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory")
                .default_value("./output"),
            Arg::new("tag")
                .short('t')
                .long("tag")
                .value_name("TAG")
                .help("Label in the output file name (default: ERA5 or WRF_dNN)"),
            Arg::new("parallel")
                .long("parallel")
                .help("Process stations in parallel")
                .action(ArgAction::SetTrue),
            Arg::new("num-threads")
                .short('j')
                .long("num-threads")
                .value_name("COUNT")
                .help("Number of parallel threads")
                .default_value("4"),
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (overrides RUST_LOG)")
                .value_parser(["error", "warn", "info", "debug", "trace"]),
        ]
    }

    /// Build and validate a configuration from parsed `run` arguments
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let met_source = match matches.get_one::<String>("met-source").map(String::as_str) {
            Some("wrf") => MetSource::Wrf,
            _ => MetSource::Era5,
        };
        let wrf_domain: u32 = parse_number(matches, "wrf-domain")?;
        let tag = matches
            .get_one::<String>("tag")
            .cloned()
            .unwrap_or_else(|| default_tag(met_source, wrf_domain));

        let config = Self {
            year: parse_number(matches, "year")?,
            met_source,
            wrf_domain,
            stations_file: path_arg(matches, "stations")?,
            station_data_dir: path_arg(matches, "station-data-dir")?,
            met_dir: path_arg(matches, "met-dir")?,
            modis_dir: path_arg(matches, "modis-dir")?,
            parameters_file: path_arg(matches, "parameters")?,
            output_dir: path_arg(matches, "output-dir")?,
            tag,
            parallel: matches.get_flag("parallel"),
            num_threads: parse_number(matches, "num-threads")?,
            log_level: matches.get_one::<String>("log-level").cloned(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Lay out every input under `root` with the default file names and
    /// validate the result
    pub fn for_testing(root: impl AsRef<Path>, year: i32) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let config = Self {
            year,
            stations_file: root.join("stations.csv"),
            station_data_dir: root.join("observations"),
            met_dir: root.join("met"),
            modis_dir: root.join("modis"),
            parameters_file: root.join("vprm_parameters.csv"),
            output_dir: root.join("output"),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.year < 1 {
            return Err(ConfigError::InvalidArgument(format!(
                "year must be positive, got {}",
                self.year
            )));
        }
        if self.met_source == MetSource::Wrf && self.wrf_domain == 0 {
            return Err(ConfigError::InvalidArgument(
                "WRF domain numbers start at 1".to_string(),
            ));
        }
        if self.num_threads == 0 {
            return Err(ConfigError::InvalidArgument(
                "number of threads must be at least 1".to_string(),
            ));
        }
        if self.tag.trim().is_empty() {
            return Err(ConfigError::InvalidArgument("tag must not be empty".to_string()));
        }

        check_file(&self.stations_file)?;
        check_file(&self.parameters_file)?;
        check_dir(&self.station_data_dir)?;
        check_dir(&self.met_dir)?;
        check_dir(&self.modis_dir)?;
        Ok(())
    }
}

fn check_file(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingPath(path.display().to_string()));
    }
    if !path.is_file() {
        return Err(ConfigError::NotAFile(path.display().to_string()));
    }
    Ok(())
}

fn check_dir(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingPath(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path.display().to_string()));
    }
    Ok(())
}
