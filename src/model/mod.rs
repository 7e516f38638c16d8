pub mod flux;
pub mod scalars;
pub mod vegetation;

pub use flux::*;
pub use scalars::*;
pub use vegetation::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxError {
    #[error("Series length mismatch: {0}")]
    LengthMismatch(String),
}

impl FluxError {
    /// All named series must share one length
    pub(crate) fn check_lengths(series: &[(&str, usize)]) -> Result<(), FluxError> {
        if let Some(&(_, expected)) = series.first() {
            if series.iter().any(|&(_, len)| len != expected) {
                let detail = series
                    .iter()
                    .map(|(name, len)| format!("{}={}", name, len))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(FluxError::LengthMismatch(detail));
            }
        }
        Ok(())
    }
}
