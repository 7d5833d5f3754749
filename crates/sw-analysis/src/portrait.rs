//! Phase-portrait sampling of planar vector fields.

use crate::error::{AnalysisError, AnalysisResult};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use sw_core::linspace;
use sw_model::ModelResult;

/// Sampling grid for a phase portrait.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PortraitGrid {
    /// Range of the first state component (e.g. phase angle)
    pub x_lims: (f64, f64),
    /// Range of the second state component (e.g. frequency)
    pub y_lims: (f64, f64),
    /// Points per axis
    pub points: usize,
    /// Scale every non-zero vector to unit length
    pub normalize: bool,
}

impl Default for PortraitGrid {
    fn default() -> Self {
        Self {
            x_lims: (-std::f64::consts::PI, std::f64::consts::PI),
            y_lims: (-10.0, 10.0),
            points: 100,
            normalize: true,
        }
    }
}

/// Vector field sampled on a grid.
///
/// `u[(i, j)]` and `v[(i, j)]` are the field components at `(x[j], y[i])`.
#[derive(Clone, Debug, PartialEq)]
pub struct PhasePortrait {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub u: DMatrix<f64>,
    pub v: DMatrix<f64>,
}

impl PhasePortrait {
    /// Samples as `(x, y, u, v)`, row by row.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        self.y.iter().enumerate().flat_map(move |(i, &y)| {
            self.x
                .iter()
                .enumerate()
                .map(move |(j, &x)| (x, y, self.u[(i, j)], self.v[(i, j)]))
        })
    }
}

/// Sample a planar field on `grid` at time `t`.
///
/// Rows are evaluated in parallel, so `field` must be `Fn + Sync`. Use
/// a time-invariant model such as `SwingModel`. Zero vectors are left at
/// zero when normalizing.
pub fn phase_portrait<F>(field: F, grid: &PortraitGrid, t: f64) -> AnalysisResult<PhasePortrait>
where
    F: Fn(f64, &DVector<f64>) -> ModelResult<DVector<f64>> + Sync,
{
    if grid.points < 2 {
        return Err(AnalysisError::InvalidArg {
            what: "portrait needs at least 2 points per axis",
        });
    }
    if grid.x_lims.0 >= grid.x_lims.1 || grid.y_lims.0 >= grid.y_lims.1 {
        return Err(AnalysisError::InvalidArg {
            what: "portrait limits must be increasing",
        });
    }

    let n = grid.points;
    let x = linspace(grid.x_lims.0, grid.x_lims.1, n);
    let y = linspace(grid.y_lims.0, grid.y_lims.1, n);

    let rows: Vec<Vec<(f64, f64)>> = y
        .par_iter()
        .map(|&yi| {
            x.iter()
                .map(|&xj| {
                    let d = field(t, &DVector::from_vec(vec![xj, yi]))?;
                    if d.len() != 2 {
                        return Err(AnalysisError::FieldDimension {
                            expected: 2,
                            actual: d.len(),
                        });
                    }
                    Ok(scale(d[0], d[1], grid.normalize))
                })
                .collect::<AnalysisResult<Vec<_>>>()
        })
        .collect::<AnalysisResult<Vec<_>>>()?;

    let u = DMatrix::from_fn(n, n, |i, j| rows[i][j].0);
    let v = DMatrix::from_fn(n, n, |i, j| rows[i][j].1);

    Ok(PhasePortrait { x, y, u, v })
}

fn scale(u: f64, v: f64, normalize: bool) -> (f64, f64) {
    let magnitude = u.hypot(v);
    if normalize && magnitude > 0.0 {
        (u / magnitude, v / magnitude)
    } else {
        (u, v)
    }
}
