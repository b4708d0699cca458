//! Parameter-free product copula.
use crate::bivariate::Bivariate;
use crate::bivariate::CopulaType;

/// `C(u, v) = uv`; the tournament's zero-parameter baseline.
#[derive(Debug, Clone, Copy)]
pub struct Independence;

impl Bivariate for Independence {
  fn kind(&self) -> CopulaType {
    CopulaType::Independence
  }

  fn name(&self) -> &'static str {
    "independence"
  }

  fn theta_bounds(&self) -> &'static [(f64, f64)] {
    &[]
  }

  fn theta0(&self) -> &'static [f64] {
    &[]
  }

  fn pdf(&self, _u: f64, _v: f64, _theta: &[f64]) -> f64 {
    1.0
  }

  fn cdf(&self, u: f64, v: f64, _theta: &[f64]) -> f64 {
    u * v
  }

  fn h(&self, v: f64, _u: f64, _theta: &[f64]) -> f64 {
    v
  }

  fn h_inv(&self, p: f64, _u: f64, _theta: &[f64]) -> f64 {
    p
  }

  fn generator(&self, t: f64, _theta: &[f64]) -> Option<f64> {
    Some(-t.ln())
  }

  fn tau(&self, _theta: &[f64]) -> f64 {
    0.0
  }

  fn theta_from_tau(&self, _tau: f64) -> Vec<f64> {
    Vec::new()
  }
}
