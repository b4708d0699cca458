//! # Rank correlation
//!
//! $$
//! \tau_b = \frac{C - D}{\sqrt{(C + D + T_x)(C + D + T_y)}}
//! $$
//!
use std::cmp::Ordering;

use kendalls::tau_b_with_comparator;
use ndarray::Array1;
use ndarray::Array2;

use crate::error::CopulaError;
use crate::error::Result;

/// Kendall's tau-b between two samples of equal length.
pub fn kendall_tau(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64> {
  if x.len() != y.len() {
    return Err(CopulaError::DataInsufficiency(format!(
      "sample lengths differ: {} vs {}",
      x.len(),
      y.len()
    )));
  }

  let (tau, ..) = tau_b_with_comparator(&x.to_vec(), &y.to_vec(), |a: &f64, b: &f64| {
    a.partial_cmp(b).unwrap_or(Ordering::Greater)
  })
  .map_err(|e| CopulaError::DataInsufficiency(e.to_string()))?;

  Ok(tau)
}

/// Pairwise Kendall's tau over the columns of a sample matrix.
///
/// The result is symmetric with a unit diagonal.
pub fn kendall_tau_matrix(data: &Array2<f64>) -> Result<Array2<f64>> {
  let d = data.ncols();
  let mut taus = Array2::from_elem((d, d), 1.0);

  for i in 0..d {
    for j in i + 1..d {
      let tau = kendall_tau(&data.column(i).to_owned(), &data.column(j).to_owned())?;
      taus[[i, j]] = tau;
      taus[[j, i]] = tau;
    }
  }

  Ok(taus)
}
