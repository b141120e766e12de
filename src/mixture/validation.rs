//! Precondition checks for the fitting entry points.

use crate::error::{Error, Result};
use crate::linalg::Matrix;

use super::EmOptions;

/// Validate that `data` is an N×D dataset with D >= 1 and finite values.
///
/// `allow_empty` admits N = 0, which happens for a rank whose shard is empty.
pub fn validate_data(data: &Matrix, allow_empty: bool, op: &'static str) -> Result<()> {
    if data.cols() == 0 {
        return Err(Error::InvalidArgument {
            arg: "data",
            reason: format!("{op} requires at least 1 dimension"),
        });
    }
    if data.rows() == 0 && !allow_empty {
        return Err(Error::InvalidArgument {
            arg: "data",
            reason: format!("{op} requires at least 1 data point"),
        });
    }
    if let Some(pos) = data.as_slice().iter().position(|v| !v.is_finite()) {
        return Err(Error::InvalidArgument {
            arg: "data",
            reason: format!(
                "{op}: non-finite value at row {}, column {}",
                pos / data.cols(),
                pos % data.cols()
            ),
        });
    }
    Ok(())
}

/// Validate the number of mixture components against the number of points.
pub fn validate_n_components(k: usize, n_points: usize, op: &'static str) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidArgument {
            arg: "k",
            reason: format!("{op} requires k > 0"),
        });
    }
    if k > n_points {
        return Err(Error::InvalidArgument {
            arg: "k",
            reason: format!("{op}: k={k} exceeds number of points {n_points}"),
        });
    }
    Ok(())
}

/// Validate numeric options.
pub fn validate_options(options: &EmOptions, op: &'static str) -> Result<()> {
    if options.max_iter == 0 {
        return Err(Error::InvalidArgument {
            arg: "max_iter",
            reason: format!("{op} requires max_iter > 0"),
        });
    }
    if !options.tol.is_finite() || options.tol < 0.0 {
        return Err(Error::InvalidArgument {
            arg: "tol",
            reason: format!("{op} requires finite tol >= 0, got {}", options.tol),
        });
    }
    if !options.reg_covar.is_finite() || options.reg_covar < 0.0 {
        return Err(Error::InvalidArgument {
            arg: "reg_covar",
            reason: format!("{op} requires finite reg_covar >= 0, got {}", options.reg_covar),
        });
    }
    if !options.responsibility_epsilon.is_finite() || options.responsibility_epsilon < 0.0 {
        return Err(Error::InvalidArgument {
            arg: "responsibility_epsilon",
            reason: format!(
                "{op} requires finite responsibility_epsilon >= 0, got {}",
                options.responsibility_epsilon
            ),
        });
    }
    Ok(())
}
