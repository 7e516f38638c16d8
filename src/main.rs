use clap::{Arg, ArgMatches, Command};
use log::{error, info};
use std::path::{Path, PathBuf};
use vprm_offline::{
    config::{ConfigError, RunConfig},
    data_io::stations::{has_observations, list_file_names, read_station_table},
    logger::init_logging,
    model::vegetation::VegetationClass,
    parallel::{run_pipeline, PipelineError},
};

fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("run", sub_matches)) => {
            let config = match RunConfig::from_matches(sub_matches) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            };
            init_logging(config.log_level.as_deref());
            if let Err(e) = run_model(&config) {
                error!("Model run failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(("stations", sub_matches)) => {
            init_logging(None);
            if let Err(e) = list_stations(sub_matches) {
                error!("Station listing failed: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Please specify a subcommand. Use --help for more information.");
            std::process::exit(1);
        }
    }
}

fn run_model(config: &RunConfig) -> Result<(), PipelineError> {
    info!(
        "VPRM {} run for {} using {:?} meteorology from {}",
        config.tag,
        config.year,
        config.met_source,
        config.met_dir.display()
    );
    let path = run_pipeline(config)?;
    info!("Output written to {}", path.display());
    Ok(())
}

/// Print the station table with each station's IGBP code, class and whether it has
/// observations for the requested year
fn list_stations(matches: &ArgMatches) -> Result<(), PipelineError> {
    let stations_file = matches
        .get_one::<String>("stations")
        .map(PathBuf::from)
        .unwrap_or_default();
    let records = read_station_table(&stations_file)?;

    let observed = match (
        matches.get_one::<String>("station-data-dir"),
        matches.get_one::<String>("year"),
    ) {
        (Some(dir), Some(year)) => {
            let year: i32 = year.parse().map_err(|_| {
                ConfigError::InvalidArgument(format!("--year: cannot parse '{}'", year))
            })?;
            Some((list_file_names(Path::new(dir))?, year))
        }
        _ => None,
    };

    println!(
        "{:<10} {:>9} {:>10} {:>7}  {:<5} {:<25} Observed",
        "Station", "Latitude", "Longitude", "Tile", "IGBP", "Class"
    );
    for record in &records {
        let status = match &observed {
            Some((names, year)) => {
                if has_observations(names, &record.name, *year) {
                    "yes"
                } else {
                    "no"
                }
            }
            None => "-",
        };
        let class = VegetationClass::from_igbp(&record.igbp)
            .map(|class| class.to_string())
            .unwrap_or_else(|| "unmapped".to_string());
        println!(
            "{:<10} {:>9.4} {:>10.4} {:>7}  {:<5} {:<25} {}",
            record.name,
            record.latitude,
            record.longitude,
            format!("h{:02}v{:02}", record.tile.0, record.tile.1),
            record.igbp,
            class,
            status
        );
    }
    Ok(())
}

fn build_cli() -> Command {
    Command::new("vprm_offline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Offline VPRM point model: GEE, RSP and NEE at flux-tower stations")
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Compute half-hourly fluxes for every observed station")
                .args(RunConfig::args()),
        )
        .subcommand(
            Command::new("stations")
                .about("List the station table")
                .arg(
                    Arg::new("stations")
                        .short('s')
                        .long("stations")
                        .value_name("FILE")
                        .help("Station table")
                        .required(true),
                )
                .arg(
                    Arg::new("station-data-dir")
                        .long("station-data-dir")
                        .value_name("DIR")
                        .help("Observation directory to check against")
                        .requires("year"),
                )
                .arg(
                    Arg::new("year")
                        .short('y')
                        .long("year")
                        .value_name("YEAR")
                        .help("Year to check observations for"),
                ),
        )
}
