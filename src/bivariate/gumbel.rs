//! # Gumbel copula
//!
//! $$
//! C(u, v) = \exp\left(-S^{1/\theta}\right), \qquad
//! S = (-\ln u)^\theta + (-\ln v)^\theta
//! $$
//!
use crate::bivariate::Bivariate;
use crate::bivariate::CopulaType;
use crate::rotation::Rotation;

/// Upper-tail clustering extreme-value family. `theta = 1` is exact
/// independence, so no value inside the bounds is excluded.
#[derive(Debug, Clone, Copy)]
pub struct Gumbel;

fn s(u: f64, v: f64, theta: f64) -> f64 {
  (-u.ln()).powf(theta) + (-v.ln()).powf(theta)
}

impl Bivariate for Gumbel {
  fn kind(&self) -> CopulaType {
    CopulaType::Gumbel
  }

  fn name(&self) -> &'static str {
    "gumbel"
  }

  fn theta_bounds(&self) -> &'static [(f64, f64)] {
    &[(1.0, f64::INFINITY)]
  }

  fn theta0(&self) -> &'static [f64] {
    &[2.0]
  }

  fn rotations(&self) -> &'static [Rotation] {
    &Rotation::ALL
  }

  fn pdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    let s = s(u, v, th);
    let root = s.powf(1.0 / th);
    (-root).exp() / (u * v)
      * s.powf(2.0 / th - 2.0)
      * (u.ln() * v.ln()).powf(th - 1.0)
      * (1.0 + (th - 1.0) / root)
  }

  fn cdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    (-s(u, v, theta[0]).powf(1.0 / theta[0])).exp()
  }

  fn h(&self, v: f64, u: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    let s = s(u, v, th);
    (-s.powf(1.0 / th)).exp() * s.powf(1.0 / th - 1.0) * (-u.ln()).powf(th - 1.0) / u
  }

  fn generator(&self, t: f64, theta: &[f64]) -> Option<f64> {
    Some((-t.ln()).powf(theta[0]))
  }

  fn tau(&self, theta: &[f64]) -> f64 {
    1.0 - 1.0 / theta[0]
  }

  fn theta_from_tau(&self, tau: f64) -> Vec<f64> {
    let t = tau.clamp(0.05, 0.93);
    vec![1.0 / (1.0 - t)]
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn cdf_at_the_median_is_closed_form() {
    // exp(-sqrt(2) ln 2) = 2^(-sqrt 2)
    assert_relative_eq!(
      Gumbel.cdf(0.5, 0.5, &[2.0]),
      2.0_f64.powf(-(2.0_f64.sqrt())),
      max_relative = 1e-12
    );
  }

  #[test]
  fn unit_theta_is_exact_independence() {
    for &(u, v) in &[(0.2, 0.7), (0.5, 0.5), (0.9, 0.05)] {
      assert_relative_eq!(Gumbel.cdf(u, v, &[1.0]), u * v, max_relative = 1e-12);
      assert_relative_eq!(Gumbel.pdf(u, v, &[1.0]), 1.0, max_relative = 1e-12);
      assert_relative_eq!(Gumbel.h(v, u, &[1.0]), v, max_relative = 1e-12);
    }
  }

  #[test]
  fn tau_is_one_minus_inverse_theta() {
    assert_relative_eq!(Gumbel.tau(&[2.0]), 0.5);
    assert_relative_eq!(Gumbel.tau(&[8.0]), 0.875);
    assert_relative_eq!(Gumbel.theta_from_tau(0.5)[0], 2.0);
  }

  #[test]
  fn tau_seed_never_touches_the_lower_bound() {
    assert!(Gumbel.theta_from_tau(0.0)[0] > 1.0);
    assert!(Gumbel.theta_from_tau(-0.8)[0] > 1.0);
  }

  #[test]
  fn generator_hits_integer_powers() {
    assert_abs_diff_eq!(
      Gumbel.generator((-2.0_f64).exp(), &[2.0]).unwrap(),
      4.0,
      epsilon = 1e-12
    );
    assert_abs_diff_eq!(Gumbel.generator(1.0, &[3.0]).unwrap(), 0.0, epsilon = 1e-12);
  }
}
