use super::scalars::Scalars;
use super::vegetation::ClassParameters;
use super::FluxError;
use ndarray::{Array1, ArrayView1, Zip};

/// Per-second rates are accumulated over one hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// GEE, RSP and NEE of one station on the half-hourly grid
#[derive(Debug, Clone, PartialEq)]
pub struct FluxSeries {
    pub gee: Array1<f64>,
    pub rsp: Array1<f64>,
    pub nee: Array1<f64>,
}

impl FluxSeries {
    pub fn len(&self) -> usize {
        self.gee.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gee.is_empty()
    }
}

/// Gross ecosystem exchange. Uptake is negative; a positive value is
/// clamped to zero before scaling to an hourly accumulation.
pub fn gross_ecosystem_exchange(
    params: &ClassParameters,
    scalars: &Scalars,
    evi: &ArrayView1<f64>,
    rad: &ArrayView1<f64>,
) -> Array1<f64> {
    let lambda = params.lambda_gpp;
    let rad_zero = params.rad_zero;

    Zip::from(&scalars.tscale)
        .and(&scalars.wscale)
        .and(&scalars.pscale)
        .and(evi)
        .and(rad)
        .map_collect(|&t, &w, &p, &e, &r| {
            let gee = lambda * t * w * p * e * r / (1.0 + (r / rad_zero)) * (-1.0);
            let gee = if gee > 0.0 { 0.0 } else { gee };
            gee * SECONDS_PER_HOUR
        })
}

/// Ecosystem respiration, linear in temperature and never clamped
pub fn respiration(params: &ClassParameters, temp: &ArrayView1<f64>) -> Array1<f64> {
    temp.mapv(|t| (t * params.alpha_resp + params.int_resp) * SECONDS_PER_HOUR)
}

pub fn compute_fluxes(
    params: &ClassParameters,
    scalars: &Scalars,
    temp: &ArrayView1<f64>,
    evi: &ArrayView1<f64>,
    rad: &ArrayView1<f64>,
) -> Result<FluxSeries, FluxError> {
    FluxError::check_lengths(&[
        ("Tscale", scalars.tscale.len()),
        ("Wscale", scalars.wscale.len()),
        ("Pscale", scalars.pscale.len()),
        ("temperature", temp.len()),
        ("EVI", evi.len()),
        ("radiation", rad.len()),
    ])?;

    let gee = gross_ecosystem_exchange(params, scalars, evi, rad);
    let rsp = respiration(params, temp);
    let nee = &gee + &rsp;

    Ok(FluxSeries { gee, rsp, nee })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scalars::{compute_scalars, IndexBounds};
    use crate::model::vegetation::VegetationClass;

    fn params() -> ClassParameters {
        ClassParameters {
            temp_min: 0.0,
            temp_opt: 20.0,
            temp_max: 40.0,
            lambda_gpp: 0.1,
            rad_zero: 500.0,
            alpha_resp: 0.05,
            int_resp: 1.0,
        }
    }

    fn unit_scalars(n: usize) -> Scalars {
        Scalars {
            tscale: Array1::ones(n),
            wscale: Array1::ones(n),
            pscale: Array1::ones(n),
        }
    }

    #[test]
    fn test_gee_light_response() {
        let evi = Array1::from_elem(3, 0.5);
        let rad = Array1::from(vec![0.0, 500.0, 1000.0]);
        let gee = gross_ecosystem_exchange(&params(), &unit_scalars(3), &evi.view(), &rad.view());
        assert_eq!(gee[0], 0.0);
        // 0.1 * 0.5 * 500 / 2 * 3600
        assert!((gee[1] + 45000.0).abs() < 1e-6);
        // 0.1 * 0.5 * 1000 / 3 * 3600
        assert!((gee[2] + 60000.0).abs() < 1e-6);
    }

    #[test]
    fn test_gee_never_positive() {
        // Negative radiation would flip the sign of the light response
        let evi = Array1::from(vec![0.5, -0.3, 0.5]);
        let rad = Array1::from(vec![-20.0, 300.0, 300.0]);
        let gee = gross_ecosystem_exchange(&params(), &unit_scalars(3), &evi.view(), &rad.view());
        assert_eq!(gee[0], 0.0);
        assert_eq!(gee[1], 0.0);
        assert!(gee[2] < 0.0);
    }

    #[test]
    fn test_respiration_is_linear_and_unclamped() {
        let temp = Array1::from(vec![-30.0, 0.0, 20.0]);
        let rsp = respiration(&params(), &temp.view());
        assert!((rsp[0] - (-0.5 * 3600.0)).abs() < 1e-9);
        assert_eq!(rsp[1], 3600.0);
        assert!((rsp[2] - 7200.0).abs() < 1e-9);
    }

    #[test]
    fn test_nee_is_sum_of_components() {
        let n = 48;
        let temp = Array1::from_shape_fn(n, |k| 5.0 + k as f64 * 0.5);
        let evi = Array1::from_elem(n, 0.45);
        let rad = Array1::from_shape_fn(n, |k| (k as f64 * 20.0).min(800.0));
        let fluxes = compute_fluxes(&params(), &unit_scalars(n), &temp.view(), &evi.view(), &rad.view())
            .unwrap();
        assert_eq!(fluxes.len(), n);
        for k in 0..n {
            assert_eq!(fluxes.nee[k], fluxes.gee[k] + fluxes.rsp[k]);
        }
    }

    #[test]
    fn test_compute_fluxes_rejects_mismatched_lengths() {
        let temp = Array1::from_elem(4, 10.0);
        let evi = Array1::from_elem(4, 0.4);
        let rad = Array1::from_elem(5, 100.0);
        let result = compute_fluxes(&params(), &unit_scalars(4), &temp.view(), &evi.view(), &rad.view());
        assert!(matches!(result, Err(FluxError::LengthMismatch(_))));
    }

    #[test]
    fn test_deciduous_constant_drivers() {
        let n = 17520;
        let temp = Array1::from_elem(n, 20.0);
        let rad = Array1::from_elem(n, 500.0);
        let evi = Array1::from_elem(n, 0.6);
        let lswi = Array1::from_elem(n, 0.3);
        let bounds = IndexBounds::from_series(&evi.view(), &lswi.view());
        let p = params();

        let scalars = compute_scalars(
            VegetationClass::Deciduous,
            &p,
            &temp.view(),
            &evi.view(),
            &lswi.view(),
            &bounds,
        )
        .unwrap();
        // T == Topt is the optimum, not the singular point of the ratio
        assert!(scalars.tscale.iter().all(|&t| t == 1.0));
        assert!(scalars.wscale.iter().all(|&w| w == 1.0));
        // EVI never exceeds a threshold equal to its own constant value
        assert!(scalars.pscale.iter().all(|&x| (x - 0.65).abs() < 1e-12));

        let fluxes = compute_fluxes(&p, &scalars, &temp.view(), &evi.view(), &rad.view()).unwrap();
        assert_eq!(fluxes.len(), n);
        for k in 0..n {
            assert!((fluxes.rsp[k] - 7200.0).abs() < 1e-9);
            assert!((fluxes.gee[k] + 35100.0).abs() < 1e-6);
            assert!((fluxes.nee[k] + 27900.0).abs() < 1e-6);
        }
    }
}
