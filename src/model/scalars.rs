//! Temperature, water and phenology scalars of the VPRM light-use model.
//!
//! Every scalar is a pure function of the vegetation class, its parameters
//! and the driving half-hourly series. Results are clamped so negative
//! values never reach the flux model.

use super::vegetation::{ClassParameters, VegetationClass};
use super::FluxError;
use log::warn;
use ndarray::{Array1, ArrayView1, Zip};

/// Fraction of the seasonal EVI range above EVImin at which leaf
/// phenology is considered fully developed
pub const PHENOLOGY_THRESHOLD_FRACTION: f64 = 0.55;

/// Seasonal extremes of the resampled vegetation indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexBounds {
    pub evi_max: f64,
    pub evi_min: f64,
    pub lswi_max: f64,
    pub lswi_min: f64,
}

impl IndexBounds {
    /// Extremes over the whole series, NaN samples skipped
    pub fn from_series(evi: &ArrayView1<f64>, lswi: &ArrayView1<f64>) -> Self {
        let (evi_min, evi_max) = min_max(evi);
        let (lswi_min, lswi_max) = min_max(lswi);
        Self {
            evi_max,
            evi_min,
            lswi_max,
            lswi_min,
        }
    }

    /// EVI above which threshold classes get a phenology scalar of one
    pub fn evi_threshold(&self) -> f64 {
        self.evi_min + PHENOLOGY_THRESHOLD_FRACTION * (self.evi_max - self.evi_min)
    }
}

fn min_max(series: &ArrayView1<f64>) -> (f64, f64) {
    series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        })
}

fn clamp_negative(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Scalars aligned to the half-hourly grid
#[derive(Debug, Clone, PartialEq)]
pub struct Scalars {
    pub tscale: Array1<f64>,
    pub wscale: Array1<f64>,
    pub pscale: Array1<f64>,
}

/// Temperature scalar
/// `(T-Tmin)(T-Tmax) / [(T-Tmin)(T-Tmax) - (T-Topt)^2]`.
///
/// Zero outside `[Tmin, Tmax]` and wherever the ratio is negative or not
/// finite; inside the range the ratio lies in `[0, 1]` and equals one at
/// `T == Topt`.
pub fn temperature_scalar(temp: f64, params: &ClassParameters) -> f64 {
    if !(temp >= params.temp_min && temp <= params.temp_max) {
        return 0.0;
    }
    let span = (temp - params.temp_min) * (temp - params.temp_max);
    let ratio = span / (span - (temp - params.temp_opt) * (temp - params.temp_opt));
    if ratio.is_finite() && ratio >= 0.0 {
        ratio
    } else {
        0.0
    }
}

pub fn temperature_scalars(temp: &ArrayView1<f64>, params: &ClassParameters) -> Array1<f64> {
    temp.mapv(|t| temperature_scalar(t, params))
}

/// Water scalar: relative to the LSWI range for xeric classes, relative to
/// the wettest state otherwise. A flat LSWI series leaves the xeric ratio
/// undefined; it is reported but not altered.
pub fn water_scalars(
    class: VegetationClass,
    lswi: &ArrayView1<f64>,
    bounds: &IndexBounds,
) -> Array1<f64> {
    let scaled = if class.is_xeric() {
        if bounds.lswi_max == bounds.lswi_min {
            warn!(
                "LSWI is constant ({}) for xeric class {}; water scalar is undefined",
                bounds.lswi_max, class
            );
        }
        let range = bounds.lswi_max - bounds.lswi_min;
        lswi.mapv(|x| (x - bounds.lswi_min) / range)
    } else {
        lswi.mapv(|x| (1.0 + x) / (1.0 + bounds.lswi_max))
    };
    scaled.mapv_into(clamp_negative)
}

/// Phenology scalar: `(1 + LSWI) / 2`, one throughout for evergreens and one
/// past the EVI green-up threshold for threshold classes.
pub fn phenology_scalars(
    class: VegetationClass,
    evi: &ArrayView1<f64>,
    lswi: &ArrayView1<f64>,
    bounds: &IndexBounds,
) -> Array1<f64> {
    if class.is_evergreen() {
        return Array1::ones(lswi.len());
    }

    let mut pscale = lswi.mapv(|x| (1.0 + x) / 2.0);
    if class.phenology_uses_evi_threshold() {
        let threshold = bounds.evi_threshold();
        Zip::from(&mut pscale).and(evi).for_each(|p, &e| {
            if e > threshold {
                *p = 1.0;
            }
        });
    }
    pscale.mapv_into(clamp_negative)
}

/// All three scalars for one station
pub fn compute_scalars(
    class: VegetationClass,
    params: &ClassParameters,
    temp: &ArrayView1<f64>,
    evi: &ArrayView1<f64>,
    lswi: &ArrayView1<f64>,
    bounds: &IndexBounds,
) -> Result<Scalars, FluxError> {
    FluxError::check_lengths(&[("temperature", temp.len()), ("EVI", evi.len()), ("LSWI", lswi.len())])?;

    Ok(Scalars {
        tscale: temperature_scalars(temp, params),
        wscale: water_scalars(class, lswi, bounds),
        pscale: phenology_scalars(class, evi, lswi, bounds),
    })
}
