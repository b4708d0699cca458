//! # Gaussian copula
//!
//! $$
//! c(u, v) = \frac{1}{\sqrt{1-\rho^2}}
//! \exp\left(\frac{2\rho x y - \rho^2 (x^2 + y^2)}{2(1-\rho^2)}\right),
//! \qquad x = \Phi^{-1}(u), \; y = \Phi^{-1}(v)
//! $$
//!
use gauss_quad::GaussLegendre;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use crate::bivariate::Bivariate;
use crate::bivariate::CopulaType;

/// Correlation copula of a bivariate normal with standard margins.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian;

impl Bivariate for Gaussian {
  fn kind(&self) -> CopulaType {
    CopulaType::Gaussian
  }

  fn name(&self) -> &'static str {
    "gaussian"
  }

  fn theta_bounds(&self) -> &'static [(f64, f64)] {
    &[(-1.0, 1.0)]
  }

  fn invalid_thetas(&self) -> &'static [f64] {
    &[-1.0, 1.0]
  }

  fn theta0(&self) -> &'static [f64] {
    &[0.0]
  }

  fn pdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let rho = theta[0];
    let norm = Normal::new(0.0, 1.0).unwrap();
    let x = norm.inverse_cdf(u);
    let y = norm.inverse_cdf(v);
    let r2 = 1.0 - rho * rho;
    ((2.0 * rho * x * y - rho * rho * (x * x + y * y)) / (2.0 * r2)).exp() / r2.sqrt()
  }

  /// Plackett's identity: the cdf is `uv` plus the integral of the
  /// standard bivariate normal density over correlations `[0, rho]`.
  fn cdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let rho = theta[0];
    let norm = Normal::new(0.0, 1.0).unwrap();
    let x = norm.inverse_cdf(u);
    let y = norm.inverse_cdf(v);

    let quad = GaussLegendre::new(32).unwrap();
    let correction = quad.integrate(0.0, rho, |r| {
      let r2 = 1.0 - r * r;
      (-(x * x - 2.0 * r * x * y + y * y) / (2.0 * r2)).exp()
        / (2.0 * std::f64::consts::PI * r2.sqrt())
    });

    u * v + correction
  }

  fn h(&self, v: f64, u: f64, theta: &[f64]) -> f64 {
    let rho = theta[0];
    let norm = Normal::new(0.0, 1.0).unwrap();
    let x = norm.inverse_cdf(u);
    let y = norm.inverse_cdf(v);
    norm.cdf((y - rho * x) / (1.0 - rho * rho).sqrt())
  }

  fn h_inv(&self, p: f64, u: f64, theta: &[f64]) -> f64 {
    let rho = theta[0];
    let norm = Normal::new(0.0, 1.0).unwrap();
    let x = norm.inverse_cdf(u);
    norm.cdf(norm.inverse_cdf(p) * (1.0 - rho * rho).sqrt() + rho * x)
  }

  fn tau(&self, theta: &[f64]) -> f64 {
    2.0 * theta[0].asin() / std::f64::consts::PI
  }

  fn theta_from_tau(&self, tau: f64) -> Vec<f64> {
    vec![(std::f64::consts::FRAC_PI_2 * tau).sin().clamp(-0.999, 0.999)]
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn density_at_the_median_is_closed_form() {
    // x = y = 0 leaves only the normalizing constant.
    assert_relative_eq!(
      Gaussian.pdf(0.5, 0.5, &[0.5]),
      1.0 / 0.75_f64.sqrt(),
      max_relative = 1e-12
    );
  }

  #[test]
  fn median_orthant_probability_matches_sheppard() {
    // C(1/2, 1/2) = 1/4 + asin(rho) / (2 pi)
    let expected = 0.25 + 0.5_f64.asin() / (2.0 * std::f64::consts::PI);
    assert_relative_eq!(Gaussian.cdf(0.5, 0.5, &[0.5]), expected, max_relative = 1e-9);
    assert_relative_eq!(Gaussian.cdf(0.5, 0.5, &[0.5]), 1.0 / 3.0, max_relative = 1e-9);
  }

  #[test]
  fn negative_correlation_integrates_downward() {
    let expected = 0.25 + (-0.7_f64).asin() / (2.0 * std::f64::consts::PI);
    assert_relative_eq!(
      Gaussian.cdf(0.5, 0.5, &[-0.7]),
      expected,
      max_relative = 1e-9
    );
  }

  #[test]
  fn tau_follows_the_arcsine_law() {
    assert_relative_eq!(Gaussian.tau(&[0.5]), 1.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(Gaussian.theta_from_tau(1.0 / 3.0)[0], 0.5, max_relative = 1e-12);
    assert_relative_eq!(Gaussian.tau(&[0.0]), 0.0);
  }

  #[test]
  fn conditional_cdf_is_normal_regression() {
    assert_relative_eq!(Gaussian.h(0.5, 0.5, &[0.8]), 0.5, max_relative = 1e-12);
    // conditioning pulls the conditional mass toward the conditioning value
    assert!(Gaussian.h(0.5, 0.9, &[0.8]) < 0.5);
    assert!(Gaussian.h(0.5, 0.1, &[0.8]) > 0.5);
  }
}
