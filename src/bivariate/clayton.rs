//! # Clayton copula
//!
//! $$
//! C(u, v) = \left(u^{-\theta} + v^{-\theta} - 1\right)^{-1/\theta}
//! $$
//!
use crate::bivariate::Bivariate;
use crate::bivariate::CopulaType;
use crate::bivariate::INDEP_EPS;
use crate::rotation::Rotation;

/// Lower-tail clustering Archimedean family; rotations move the cluster
/// into the other corners.
#[derive(Debug, Clone, Copy)]
pub struct Clayton;

/// `ln(u^-t + v^-t - 1)` without overflowing the intermediate powers.
fn log_s(u: f64, v: f64, theta: f64) -> f64 {
  let a = -theta * u.ln();
  let b = -theta * v.ln();
  let m = a.max(b);
  m + ((a - m).exp() + (b - m).exp() - (-m).exp()).ln()
}

impl Bivariate for Clayton {
  fn kind(&self) -> CopulaType {
    CopulaType::Clayton
  }

  fn name(&self) -> &'static str {
    "clayton"
  }

  fn theta_bounds(&self) -> &'static [(f64, f64)] {
    &[(0.0, f64::INFINITY)]
  }

  fn invalid_thetas(&self) -> &'static [f64] {
    &[0.0]
  }

  fn theta0(&self) -> &'static [f64] {
    &[1.0]
  }

  fn rotations(&self) -> &'static [Rotation] {
    &Rotation::ALL
  }

  fn pdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return 1.0;
    }
    let log_density = (1.0 + th).ln()
      - (th + 1.0) * (u.ln() + v.ln())
      - (2.0 * th + 1.0) / th * log_s(u, v, th);
    log_density.exp()
  }

  fn cdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return u * v;
    }
    (-log_s(u, v, th) / th).exp()
  }

  fn h(&self, v: f64, u: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return v;
    }
    (-(th + 1.0) * u.ln() - (th + 1.0) / th * log_s(u, v, th)).exp()
  }

  fn h_inv(&self, p: f64, u: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return p;
    }
    let w = u.powf(-th) * (p.powf(-th / (th + 1.0)) - 1.0) + 1.0;
    w.powf(-1.0 / th)
  }

  fn generator(&self, t: f64, theta: &[f64]) -> Option<f64> {
    let th = theta[0];
    Some((t.powf(-th) - 1.0) / th)
  }

  fn tau(&self, theta: &[f64]) -> f64 {
    theta[0] / (theta[0] + 2.0)
  }

  fn theta_from_tau(&self, tau: f64) -> Vec<f64> {
    let t = tau.clamp(0.05, 0.93);
    vec![2.0 * t / (1.0 - t)]
  }
}
