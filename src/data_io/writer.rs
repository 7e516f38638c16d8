use crate::model::flux::FluxSeries;
use log::info;
use ndarray::Array1;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column {name} has {len} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
}

/// Output file for a run: `<dir>/VPRM.<tag>_<year>.csv`
pub fn output_path(output_dir: &Path, tag: &str, year: i32) -> PathBuf {
    output_dir.join(format!("VPRM.{}_{}.csv", tag, year))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxColumn {
    pub name: String,
    pub values: Array1<f64>,
}

/// Wide table of station fluxes keyed by the `Times` column (Julian days)
#[derive(Debug, Clone, PartialEq)]
pub struct FluxTable {
    pub times: Vec<f64>,
    pub columns: Vec<FluxColumn>,
}

impl FluxTable {
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            times,
            columns: Vec::new(),
        }
    }

    pub fn add_column(&mut self, name: impl Into<String>, values: Array1<f64>) -> Result<(), WriteError> {
        let name = name.into();
        if values.len() != self.times.len() {
            return Err(WriteError::LengthMismatch {
                name,
                len: values.len(),
                expected: self.times.len(),
            });
        }
        if self.columns.iter().any(|c| c.name == name) {
            return Err(WriteError::DuplicateColumn(name));
        }
        self.columns.push(FluxColumn { name, values });
        Ok(())
    }

    /// Append `<station>_GEE`, `<station>_RSP` and `<station>_NEE`
    pub fn add_station(&mut self, station: &str, fluxes: &FluxSeries) -> Result<(), WriteError> {
        self.add_column(format!("{}_GEE", station), fluxes.gee.clone())?;
        self.add_column(format!("{}_RSP", station), fluxes.rsp.clone())?;
        self.add_column(format!("{}_NEE", station), fluxes.nee.clone())
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once("Times".to_string())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), WriteError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.header())?;

        let mut record = Vec::with_capacity(self.columns.len() + 1);
        for (row, time) in self.times.iter().enumerate() {
            record.clear();
            record.push(time.to_string());
            record.extend(self.columns.iter().map(|c| c.values[row].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the table, creating the parent directory if needed
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), WriteError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.write_to(fs::File::create(path)?)?;
        info!(
            "Wrote {} rows x {} flux columns to {}",
            self.times.len(),
            self.columns.len(),
            path.display()
        );
        Ok(())
    }
}
