use std::fs;
use std::path::Path;
use tempfile::tempdir;
use vprm_offline::config::RunConfig;
use vprm_offline::data_io::reader::{MetSeries, ReaderError};
use vprm_offline::data_io::stations::{read_station_table, Station};
use vprm_offline::model::VprmParameters;
use vprm_offline::modis::CsvModisSource;
use vprm_offline::parallel::{run_with_sources, MeteorologySource};
use vprm_offline::time_utils::HALF_HOURLY_STEPS;

/// Constant 20 °C and 500 W/m² at every station
struct SteadyMet;

impl MeteorologySource for SteadyMet {
    fn point_series(&self, _station: &Station) -> Result<MetSeries, ReaderError> {
        let n = 365 * 24;
        Ok(MetSeries {
            temperature: vec![20.0; n],
            radiation: vec![500.0; n],
        })
    }
}

fn write_inputs(root: &Path) {
    for dir in ["observations", "met", "modis"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }

    fs::write(
        root.join("stations.csv"),
        "Station,Latitude,Longitude,tile_h,tile_v,IGBP\n\
         DE-Hai,51.0792,10.4522,18,3,DBF\n\
         FI-Hyy,61.8474,24.2948,19,2,ENF\n",
    )
    .unwrap();

    let mut params = String::from("class,tempMin,tempOpt,tempMax,lambdaGPP.sw,swradZero,alphaResp,intResp\n");
    for class in 0..8 {
        params.push_str(&format!("{},0,20,40,0.1,500,0.05,1.0\n", class));
    }
    fs::write(root.join("vprm_parameters.csv"), params).unwrap();

    // Only DE-Hai has observations in 2015
    fs::write(root.join("observations").join("FLX_DE-Hai_FULLSET_HH_2015-2015.csv"), "x\n").unwrap();
    fs::write(root.join("observations").join("FLX_FI-Hyy_FULLSET_HH_2013-2014.csv"), "x\n").unwrap();

    let mut modis = String::from("time,evi,lswi\n");
    for k in 0..46 {
        modis.push_str(&format!("{},0.6,0.3\n", 1 + 8 * k));
    }
    fs::write(root.join("modis").join("DE-Hai_2015.csv"), modis).unwrap();
}

#[test]
fn test_deciduous_station_written_and_unobserved_station_excluded() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());

    let config = RunConfig::for_testing(dir.path(), 2015).unwrap();
    let params = VprmParameters::from_csv(&config.parameters_file).unwrap();
    let stations = read_station_table(&config.stations_file).unwrap();
    let modis = CsvModisSource::new(&config.modis_dir);

    let path = run_with_sources(&config, &params, stations, &modis, &SteadyMet).unwrap();
    assert!(path.ends_with("VPRM.ERA5_2015.csv"));

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, vec!["Times", "DE-Hai_GEE", "DE-Hai_RSP", "DE-Hai_NEE"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), HALF_HOURLY_STEPS);

    let first_time: f64 = rows[0][0].parse().unwrap();
    assert_eq!(first_time, 2457024.0);
    for row in rows.iter().step_by(997) {
        let gee: f64 = row[1].parse().unwrap();
        let rsp: f64 = row[2].parse().unwrap();
        let nee: f64 = row[3].parse().unwrap();
        assert!((rsp - 7200.0).abs() < 1e-6);
        assert!((gee + 35100.0).abs() < 1e-3);
        assert!((nee - (gee + rsp)).abs() < 1e-6);
    }
}

#[test]
fn test_parallel_run_writes_same_table() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());

    let mut config = RunConfig::for_testing(dir.path(), 2015).unwrap();
    let params = VprmParameters::from_csv(&config.parameters_file).unwrap();
    let modis = CsvModisSource::new(&config.modis_dir);

    let stations = read_station_table(&config.stations_file).unwrap();
    let sequential_path = run_with_sources(&config, &params, stations, &modis, &SteadyMet).unwrap();
    let sequential = fs::read_to_string(&sequential_path).unwrap();

    config.parallel = true;
    config.num_threads = 2;
    config.tag = "parallel".to_string();
    let stations = read_station_table(&config.stations_file).unwrap();
    let parallel_path = run_with_sources(&config, &params, stations, &modis, &SteadyMet).unwrap();
    let parallel = fs::read_to_string(&parallel_path).unwrap();

    assert_ne!(sequential_path, parallel_path);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_missing_modis_file_fails_run() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());
    fs::remove_file(dir.path().join("modis").join("DE-Hai_2015.csv")).unwrap();

    let config = RunConfig::for_testing(dir.path(), 2015).unwrap();
    let params = VprmParameters::from_csv(&config.parameters_file).unwrap();
    let stations = read_station_table(&config.stations_file).unwrap();
    let modis = CsvModisSource::new(&config.modis_dir);

    let err = run_with_sources(&config, &params, stations, &modis, &SteadyMet).unwrap_err();
    assert!(err.to_string().contains("DE-Hai"));
}

#[test]
fn test_unmapped_igbp_code_excluded_unless_observed() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());
    let mut table = fs::read_to_string(dir.path().join("stations.csv")).unwrap();
    table.push_str("US-Myb,38.0498,-121.7651,8,5,WET\n");
    fs::write(dir.path().join("stations.csv"), table).unwrap();

    let config = RunConfig::for_testing(dir.path(), 2015).unwrap();
    let params = VprmParameters::from_csv(&config.parameters_file).unwrap();
    let modis = CsvModisSource::new(&config.modis_dir);

    // Wetland site without observations is dropped before its class is needed
    let stations = read_station_table(&config.stations_file).unwrap();
    let path = run_with_sources(&config, &params, stations, &modis, &SteadyMet).unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap().len(), 4);

    // Once observed, its code has no VPRM class and the run fails
    fs::write(dir.path().join("observations").join("FLX_US-Myb_FULLSET_HH_2015-2015.csv"), "x\n").unwrap();
    let stations = read_station_table(&config.stations_file).unwrap();
    let err = run_with_sources(&config, &params, stations, &modis, &SteadyMet).unwrap_err();
    assert!(err.to_string().contains("WET"));
}
