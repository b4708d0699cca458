//! # Frank copula
//!
//! $$
//! C(u, v) = -\frac{1}{\theta}
//! \ln\left(1 + \frac{(e^{-\theta u} - 1)(e^{-\theta v} - 1)}{e^{-\theta} - 1}\right)
//! $$
//!
use gauss_quad::GaussLegendre;
use roots::find_root_brent;
use roots::SimpleConvergency;

use crate::bivariate::Bivariate;
use crate::bivariate::CopulaType;
use crate::bivariate::INDEP_EPS;
use crate::rotation::Rotation;

/// Radially symmetric Archimedean family without tail dependence.
///
/// Restricted to positive `theta`; rotations supply the negative branch.
#[derive(Debug, Clone, Copy)]
pub struct Frank;

fn g(x: f64, theta: f64) -> f64 {
  (-theta * x).exp_m1()
}

/// First Debye function, `D_1(x) = x^{-1} \int_0^x t / (e^t - 1) dt`.
fn debye1(x: f64) -> f64 {
  let quad = GaussLegendre::new(64).unwrap();
  quad.integrate(0.0, x, |t| t / t.exp_m1()) / x
}

impl Bivariate for Frank {
  fn kind(&self) -> CopulaType {
    CopulaType::Frank
  }

  fn name(&self) -> &'static str {
    "frank"
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
    let g1 = g(1.0, th);
    let denominator = g1 + g(u, th) * g(v, th);
    -th * g1 * (-th * (u + v)).exp() / (denominator * denominator)
  }

  fn cdf(&self, u: f64, v: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return u * v;
    }
    -(g(u, th) * g(v, th) / g(1.0, th)).ln_1p() / th
  }

  fn h(&self, v: f64, u: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return v;
    }
    let gv = g(v, th);
    (-th * u).exp() * gv / (g(1.0, th) + g(u, th) * gv)
  }

  fn h_inv(&self, p: f64, u: f64, theta: &[f64]) -> f64 {
    let th = theta[0];
    if th < INDEP_EPS {
      return p;
    }
    let gv = p * g(1.0, th) / ((-th * u).exp() - p * g(u, th));
    -gv.ln_1p() / th
  }

  fn generator(&self, t: f64, theta: &[f64]) -> Option<f64> {
    let th = theta[0];
    Some(-(g(t, th) / g(1.0, th)).ln())
  }

  fn tau(&self, theta: &[f64]) -> f64 {
    let th = theta[0];
    1.0 - 4.0 / th * (1.0 - debye1(th))
  }

  fn theta_from_tau(&self, tau: f64) -> Vec<f64> {
    let target = tau.clamp(-0.95, 0.95);
    if target <= 0.0 {
      return vec![1.0];
    }
    let mut convergency = SimpleConvergency {
      eps: 1e-10,
      max_iter: 100,
    };
    let theta = find_root_brent(1e-6, 100.0, |th| Frank.tau(&[th]) - target, &mut convergency)
      .unwrap_or(1.0);
    vec![theta]
  }
}
