//! # Pseudo-observations
//!
//! $$
//! u_i=\frac{\operatorname{rank}(x_i)}{N+1}
//! $$
//!
use ndarray::Array1;
use ordered_float::OrderedFloat;

use crate::error::CopulaError;
use crate::error::Result;

/// Normalized average ranks of a sample, mapped into the open unit interval.
///
/// Ties receive their mean rank. Dividing by N+1 keeps every value strictly
/// inside (0, 1), so conditional quantiles stay evaluable downstream.
pub fn pseudo_observations(x: &Array1<f64>) -> Result<Array1<f64>> {
  if x.is_empty() {
    return Err(CopulaError::DataInsufficiency("empty sample".into()));
  }
  if x.iter().any(|v| !v.is_finite()) {
    return Err(CopulaError::DomainError(
      "sample contains non-finite values".into(),
    ));
  }

  let n = x.len();
  let mut idx: Vec<usize> = (0..n).collect();
  idx.sort_by_key(|&i| OrderedFloat(x[i]));

  let mut ranks = vec![0.0; n];
  let mut start = 0;
  while start < n {
    let mut end = start + 1;
    while end < n && x[idx[end]] == x[idx[start]] {
      end += 1;
    }
    // mean of the one-based ranks start+1 ..= end
    let mean_rank = (start + 1 + end) as f64 / 2.0;
    for &i in &idx[start..end] {
      ranks[i] = mean_rank;
    }
    start = end;
  }

  Ok(Array1::from(ranks) / (n + 1) as f64)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn ranks_are_normalized_and_order_preserving() {
    let u = pseudo_observations(&array![3.0, 1.0, 2.0]).unwrap();
    assert_relative_eq!(u[0], 3.0 / 4.0);
    assert_relative_eq!(u[1], 1.0 / 4.0);
    assert_relative_eq!(u[2], 2.0 / 4.0);
  }

  #[test]
  fn ties_share_their_mean_rank() {
    let u = pseudo_observations(&array![1.0, 1.0, 2.0]).unwrap();
    assert_relative_eq!(u[0], 1.5 / 4.0);
    assert_relative_eq!(u[1], 1.5 / 4.0);
    assert_relative_eq!(u[2], 3.0 / 4.0);
  }

  #[test]
  fn output_stays_inside_the_open_interval() {
    let x = Array1::linspace(-50.0, 50.0, 101);
    let u = pseudo_observations(&x).unwrap();
    assert!(u.iter().all(|&v| v > 0.0 && v < 1.0));
  }

  #[test]
  fn non_finite_input_is_rejected() {
    let err = pseudo_observations(&array![1.0, f64::NAN, 2.0]).unwrap_err();
    assert!(matches!(err, CopulaError::DomainError(_)));
  }

  #[test]
  fn empty_input_is_rejected() {
    let err = pseudo_observations(&Array1::zeros(0)).unwrap_err();
    assert!(matches!(err, CopulaError::DataInsufficiency(_)));
  }
}
