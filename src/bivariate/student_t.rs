//! Student-t copula parameterized as `[rho, nu]`.
use gauss_quad::GaussLegendre;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::StudentsT;
use statrs::function::gamma::ln_gamma;

use crate::bivariate::Bivariate;
use crate::bivariate::CopulaType;

/// Degrees-of-freedom grid profiled during fitting; the likelihood is
/// flat in `nu` beyond this range.
pub const NU_GRID: [f64; 6] = [2.5, 4.0, 6.0, 10.0, 20.0, 30.0];

pub(crate) fn t_dist(nu: f64) -> StudentsT {
  StudentsT::new(0.0, 1.0, nu).unwrap()
}

/// Copula log-density in terms of the t-scores `x = T_nu^{-1}(u)`,
/// `y = T_nu^{-1}(v)`. Profile fitting caches the scores per `nu`.
pub(crate) fn log_pdf_scores(x: f64, y: f64, rho: f64, nu: f64) -> f64 {
  let r2 = 1.0 - rho * rho;
  ln_gamma((nu + 2.0) / 2.0) + ln_gamma(nu / 2.0) - 2.0 * ln_gamma((nu + 1.0) / 2.0)
    - 0.5 * r2.ln()
    - (nu + 2.0) / 2.0 * (1.0 + (x * x - 2.0 * rho * x * y + y * y) / (nu * r2)).ln()
    + (nu + 1.0) / 2.0 * ((1.0 + x * x / nu).ln() + (1.0 + y * y / nu).ln())
}

/// Elliptical copula with symmetric tail dependence in both corners.
#[derive(Debug, Clone, Copy)]
pub struct StudentT;

impl Bivariate for StudentT {
  fn kind(&self) -> CopulaType {
    CopulaType::StudentT
  }

  fn name(&self) -> &'static str {
    "student_t"
  }

  fn theta_bounds(&self) -> &'static [(f64, f64)] {
    &[(-1.0, 1.0), (2.0, f64::INFINITY)]
  }

  fn invalid_thetas(&self) -> &'static [f64] {
    &[-1.0, 1.0]
  }

  fn theta0(&self) -> &'static [f64] {
    &[0.0, 4.0]
  }

  fn pdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let (rho, nu) = (theta[0], theta[1]);
    let t = t_dist(nu);
    log_pdf_scores(t.inverse_cdf(u), t.inverse_cdf(v), rho, nu).exp()
  }

  fn cdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let quad = GaussLegendre::new(64).unwrap();
    quad.integrate(0.0, u, |s| self.h(v, s, theta))
  }

  /// Conditioning an elliptical t on one coordinate yields a scaled t
  /// with one extra degree of freedom.
  fn h(&self, v: f64, u: f64, theta: &[f64]) -> f64 {
    let (rho, nu) = (theta[0], theta[1]);
    let t = t_dist(nu);
    let x = t.inverse_cdf(u);
    let y = t.inverse_cdf(v);
    let scale = ((nu + x * x) * (1.0 - rho * rho) / (nu + 1.0)).sqrt();
    t_dist(nu + 1.0).cdf((y - rho * x) / scale)
  }

  fn h_inv(&self, p: f64, u: f64, theta: &[f64]) -> f64 {
    let (rho, nu) = (theta[0], theta[1]);
    let t = t_dist(nu);
    let x = t.inverse_cdf(u);
    let scale = ((nu + x * x) * (1.0 - rho * rho) / (nu + 1.0)).sqrt();
    t.cdf(t_dist(nu + 1.0).inverse_cdf(p) * scale + rho * x)
  }

  fn tau(&self, theta: &[f64]) -> f64 {
    2.0 * theta[0].asin() / std::f64::consts::PI
  }

  fn theta_from_tau(&self, tau: f64) -> Vec<f64> {
    vec![
      (std::f64::consts::FRAC_PI_2 * tau).sin().clamp(-0.999, 0.999),
      4.0,
    ]
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn central_density_reduces_to_gamma_ratios() {
    // rho = 0 and x = y = 0: c = G(3.5) G(2.5) / G(3)^2
    assert_relative_eq!(
      StudentT.pdf(0.5, 0.5, &[0.0, 5.0]),
      1.1044668,
      max_relative = 1e-6
    );
  }

  #[test]
  fn median_orthant_probability_matches_the_elliptical_formula() {
    assert_abs_diff_eq!(StudentT.cdf(0.5, 0.5, &[0.0, 5.0]), 0.25, epsilon = 1e-3);
    assert_abs_diff_eq!(
      StudentT.cdf(0.5, 0.5, &[0.5, 5.0]),
      1.0 / 3.0,
      epsilon = 1e-3
    );
  }

  #[test]
  fn conditional_median_is_unmoved_without_correlation() {
    assert_relative_eq!(StudentT.h(0.5, 0.5, &[0.0, 5.0]), 0.5, max_relative = 1e-12);
    assert_relative_eq!(
      StudentT.h_inv(0.5, 0.5, &[0.0, 5.0]),
      0.5,
      max_relative = 1e-12
    );
  }

  #[test]
  fn tau_ignores_the_degrees_of_freedom() {
    assert_relative_eq!(StudentT.tau(&[0.5, 2.5]), 1.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(StudentT.tau(&[0.5, 30.0]), 1.0 / 3.0, max_relative = 1e-12);
    let seed = StudentT.theta_from_tau(1.0 / 3.0);
    assert_relative_eq!(seed[0], 0.5, max_relative = 1e-12);
    assert_relative_eq!(seed[1], 4.0);
  }
}
