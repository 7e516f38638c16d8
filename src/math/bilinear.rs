use super::interpolate::InterpolationError;
use ndarray::{Array1, ArrayD, ArrayView3, ArrayViewD, Axis, Ix1};

/// Bilinear weights of a point inside (or extrapolated from) one grid cell.
///
/// `isw`/`jsw` are the longitude/latitude indices of the cell's south-west
/// corner; the cell spans `[jsw, jsw + 1] x [isw, isw + 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilinearWeights {
    pub isw: usize,
    pub jsw: usize,
    pub ne: f64,
    pub nw: f64,
    pub se: f64,
    pub sw: f64,
}

impl BilinearWeights {
    pub fn sum(&self) -> f64 {
        self.ne + self.nw + self.se + self.sw
    }
}

/// Index of the axis value closest to `target`, first match on ties
fn nearest_index(axis: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (k, &value) in axis.iter().enumerate() {
        let dist = (target - value).abs();
        if dist < best_dist {
            best = k;
            best_dist = dist;
        }
    }
    best
}

/// South-west index along one axis: step back one node when the nearest
/// node sits at or beyond the target, then keep the cell inside the grid.
fn south_west_index(axis: &[f64], target: f64) -> usize {
    let nearest = nearest_index(axis, target);
    let sw = if axis[nearest] >= target {
        nearest.saturating_sub(1)
    } else {
        nearest
    };
    sw.min(axis.len() - 2)
}

fn check_axis(name: &str, axis: &[f64]) -> Result<(), InterpolationError> {
    if axis.len() < 2 {
        return Err(InterpolationError::InvalidGrid(format!(
            "{} axis needs at least two points, got {}",
            name,
            axis.len()
        )));
    }
    if !axis.windows(2).all(|w| w[0] < w[1]) {
        return Err(InterpolationError::InvalidGrid(format!(
            "{} axis must be strictly ascending",
            name
        )));
    }
    Ok(())
}

/// Find the enclosing cell of (`lat`, `lon`) and its bilinear weights.
///
/// `grid_lats` must be ascending; native north-to-south grids are reversed
/// by the caller. Points outside the grid reuse the boundary cell, which
/// extrapolates linearly while the weights still sum to one.
pub fn locate(
    lat: f64,
    lon: f64,
    grid_lats: &[f64],
    grid_lons: &[f64],
) -> Result<BilinearWeights, InterpolationError> {
    check_axis("latitude", grid_lats)?;
    check_axis("longitude", grid_lons)?;

    let jsw = south_west_index(grid_lats, lat);
    let isw = south_west_index(grid_lons, lon);

    let (lat0, lat1) = (grid_lats[jsw], grid_lats[jsw + 1]);
    let (lon0, lon1) = (grid_lons[isw], grid_lons[isw + 1]);
    let dlat = lat1 - lat0;
    let dlon = lon1 - lon0;

    Ok(BilinearWeights {
        isw,
        jsw,
        ne: ((lat - lat0) / dlat) * ((lon - lon0) / dlon),
        se: ((lat1 - lat) / dlat) * ((lon - lon0) / dlon),
        sw: ((lat1 - lat) / dlat) * ((lon1 - lon) / dlon),
        nw: ((lat - lat0) / dlat) * ((lon1 - lon) / dlon),
    })
}

/// Reduce a field whose last two axes are (lat, lon) to the weighted point
/// value for every leading index.
pub fn apply(
    field: &ArrayViewD<f64>,
    weights: &BilinearWeights,
) -> Result<ArrayD<f64>, InterpolationError> {
    let nd = field.ndim();
    if nd < 2 {
        return Err(InterpolationError::GridMismatch(format!(
            "field has {} dimensions, expected at least (lat, lon)",
            nd
        )));
    }
    let (nlat, nlon) = (field.shape()[nd - 2], field.shape()[nd - 1]);
    let (j, i) = (weights.jsw, weights.isw);
    if j + 1 >= nlat || i + 1 >= nlon {
        return Err(InterpolationError::GridMismatch(format!(
            "cell ({}, {}) outside a {}x{} field",
            j, i, nlat, nlon
        )));
    }

    // Removing the lat axis moves lon into its place
    let corner = |jj: usize, ii: usize| {
        field
            .index_axis(Axis(nd - 2), jj)
            .index_axis_move(Axis(nd - 2), ii)
    };

    Ok(&corner(j + 1, i + 1) * weights.ne
        + &corner(j + 1, i) * weights.nw
        + &corner(j, i + 1) * weights.se
        + &corner(j, i) * weights.sw)
}

/// [`apply`] for a `[time, lat, lon]` field
pub fn apply_series(
    field: &ArrayView3<f64>,
    weights: &BilinearWeights,
) -> Result<Array1<f64>, InterpolationError> {
    apply(&field.view().into_dyn(), weights)?
        .into_dimensionality::<Ix1>()
        .map_err(|e| InterpolationError::GridMismatch(e.to_string()))
}
