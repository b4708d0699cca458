//! # Bivariate copula families
//!
//! $$
//! h(v \mid u) = \frac{\partial C(u, v)}{\partial u}, \qquad
//! v = h^{-1}(p \mid u)
//! $$
//!
//! Families are stateless kernels evaluated at explicit parameter vectors.
//! [`Copula`] wraps a family with a [`Rotation`] and a fitted parameter
//! vector and exposes the array-facing surface used by fitting and vines.
use ndarray::stack;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;
use roots::find_root_brent;
use roots::SimpleConvergency;

use crate::error::CopulaError;
use crate::error::Result;
use crate::rotation::rotate_cdf;
use crate::rotation::rotate_h;
use crate::rotation::rotate_h_inv;
use crate::rotation::rotate_pdf;
use crate::rotation::Rotation;

pub mod clayton;
pub mod frank;
pub mod gaussian;
pub mod gumbel;
pub mod independence;
pub mod student_t;

pub use clayton::Clayton;
pub use frank::Frank;
pub use gaussian::Gaussian;
pub use gumbel::Gumbel;
pub use independence::Independence;
pub use student_t::StudentT;

/// Evaluation happens on [UNIT_EPS, 1 - UNIT_EPS]; exact 0 and 1 are
/// reserved for the cdf boundary identities.
pub(crate) const UNIT_EPS: f64 = 1e-12;

/// Parameters this close to the independence limit short-circuit to the
/// independence forms before the family kernels lose precision.
pub(crate) const INDEP_EPS: f64 = 1e-10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CopulaType {
  Gaussian,
  StudentT,
  Frank,
  Clayton,
  Gumbel,
  Independence,
}

impl CopulaType {
  pub const ALL: [CopulaType; 6] = [
    CopulaType::Gaussian,
    CopulaType::StudentT,
    CopulaType::Frank,
    CopulaType::Clayton,
    CopulaType::Gumbel,
    CopulaType::Independence,
  ];

  pub fn family(&self) -> &'static dyn Bivariate {
    match self {
      CopulaType::Gaussian => &Gaussian,
      CopulaType::StudentT => &StudentT,
      CopulaType::Frank => &Frank,
      CopulaType::Clayton => &Clayton,
      CopulaType::Gumbel => &Gumbel,
      CopulaType::Independence => &Independence,
    }
  }

  pub fn name(&self) -> &'static str {
    self.family().name()
  }

  pub fn from_name(name: &str) -> Result<Self> {
    match name.trim().to_ascii_lowercase().as_str() {
      "gaussian" | "gauss" | "normal" => Ok(CopulaType::Gaussian),
      "student_t" | "student-t" | "studentt" | "t" => Ok(CopulaType::StudentT),
      "frank" => Ok(CopulaType::Frank),
      "clayton" => Ok(CopulaType::Clayton),
      "gumbel" => Ok(CopulaType::Gumbel),
      "independence" | "indep" => Ok(CopulaType::Independence),
      other => Err(CopulaError::InvalidParameter {
        family: "copula",
        reason: format!("unknown family name {:?}", other),
      }),
    }
  }
}

/// Scalar kernel of a bivariate copula family.
///
/// `h(v, u)` conditions on the second argument, so it is the cdf of `v`
/// given `u`, and `h_inv(p, u)` is its quantile in the first argument.
/// Implementations may assume `u`, `v` and `p` lie strictly inside the
/// unit interval and `theta` has already passed [`check_theta`].
pub trait Bivariate: Send + Sync {
  fn kind(&self) -> CopulaType;

  fn name(&self) -> &'static str;

  /// Per-parameter closed bounds; endpoints meant to be open are listed
  /// in [`Bivariate::invalid_thetas`].
  fn theta_bounds(&self) -> &'static [(f64, f64)];

  fn invalid_thetas(&self) -> &'static [f64] {
    &[]
  }

  fn param_count(&self) -> usize {
    self.theta_bounds().len()
  }

  /// Optimizer seed used when no Kendall seed is available.
  fn theta0(&self) -> &'static [f64];

  /// Rotations worth entering in a selection tournament. Radially
  /// symmetric families only need the identity.
  fn rotations(&self) -> &'static [Rotation] {
    &[Rotation::R0]
  }

  fn pdf(&self, u: f64, v: f64, theta: &[f64]) -> f64;

  fn cdf(&self, u: f64, v: f64, theta: &[f64]) -> f64;

  fn h(&self, v: f64, u: f64, theta: &[f64]) -> f64;

  fn h_inv(&self, p: f64, u: f64, theta: &[f64]) -> f64 {
    brent_h_inv(self, p, u, theta)
  }

  /// Archimedean generator, `None` for implicit families.
  fn generator(&self, _t: f64, _theta: &[f64]) -> Option<f64> {
    None
  }

  fn tau(&self, theta: &[f64]) -> f64;

  /// Moment-matching parameters for an observed Kendall's tau, clamped
  /// to the interior of the valid region so optimizers can move.
  fn theta_from_tau(&self, tau: f64) -> Vec<f64>;
}

/// Validates arity, bounds and the excluded values of a parameter vector.
pub fn check_theta(family: &dyn Bivariate, theta: &[f64]) -> Result<()> {
  let bounds = family.theta_bounds();
  if theta.len() != bounds.len() {
    return Err(CopulaError::InvalidParameter {
      family: family.name(),
      reason: format!("expected {} parameter(s), got {}", bounds.len(), theta.len()),
    });
  }

  for (i, (&th, &(lower, upper))) in theta.iter().zip(bounds).enumerate() {
    if !th.is_finite() || !(lower <= th && th <= upper) || family.invalid_thetas().contains(&th) {
      return Err(CopulaError::InvalidParameter {
        family: family.name(),
        reason: format!(
          "theta[{}] = {} must lie in [{}, {}] and not in {:?}",
          i,
          th,
          lower,
          upper,
          family.invalid_thetas()
        ),
      });
    }
  }

  Ok(())
}

/// Bracketed Brent fallback for families without a closed-form `h_inv`.
pub(crate) fn brent_h_inv<F>(family: &F, p: f64, u: f64, theta: &[f64]) -> f64
where
  F: Bivariate + ?Sized,
{
  let lower = UNIT_EPS;
  let upper = 1.0 - UNIT_EPS;
  let f = |v: f64| family.h(v, u, theta) - p;

  // h is increasing in v, so an endpoint with the wrong sign means the
  // quantile sits outside the bracket.
  if f(lower) >= 0.0 {
    return lower;
  }
  if f(upper) <= 0.0 {
    return upper;
  }

  let mut convergency = SimpleConvergency {
    eps: 1e-10,
    max_iter: 100,
  };
  find_root_brent(lower, upper, f, &mut convergency).unwrap_or(0.5)
}

pub(crate) fn clamp_unit(x: f64) -> f64 {
  x.clamp(UNIT_EPS, 1.0 - UNIT_EPS)
}

fn zip_map<F>(u: &Array1<f64>, v: &Array1<f64>, f: F) -> Array1<f64>
where
  F: Fn(f64, f64) -> f64,
{
  Array1::from_iter(u.iter().zip(v.iter()).map(|(&a, &b)| f(a, b)))
}

fn check_unit_pair(u: &Array1<f64>, v: &Array1<f64>) -> Result<()> {
  if u.len() != v.len() {
    return Err(CopulaError::DataInsufficiency(format!(
      "coordinate lengths differ: {} vs {}",
      u.len(),
      v.len()
    )));
  }
  if u
    .iter()
    .chain(v.iter())
    .any(|x| !x.is_finite() || !(0.0..=1.0).contains(x))
  {
    return Err(CopulaError::DomainError(
      "values must lie in the unit interval".into(),
    ));
  }
  Ok(())
}

/// A family plus a rotation plus (optionally) fitted parameters.
#[derive(Clone, Debug)]
pub struct Copula {
  kind: CopulaType,
  rotation: Rotation,
  theta: Option<Vec<f64>>,
}

impl Copula {
  pub fn new(kind: CopulaType, rotation: Rotation) -> Self {
    Self {
      kind,
      rotation,
      theta: None,
    }
  }

  pub fn with_theta(kind: CopulaType, rotation: Rotation, theta: &[f64]) -> Result<Self> {
    let mut copula = Self::new(kind, rotation);
    copula.set_theta(theta)?;
    Ok(copula)
  }

  pub fn from_name(name: &str, rotation: Rotation) -> Result<Self> {
    Ok(Self::new(CopulaType::from_name(name)?, rotation))
  }

  pub fn kind(&self) -> CopulaType {
    self.kind
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }

  pub fn family(&self) -> &'static dyn Bivariate {
    self.kind.family()
  }

  pub fn set_theta(&mut self, theta: &[f64]) -> Result<()> {
    check_theta(self.kind.family(), theta)?;
    self.theta = Some(theta.to_vec());
    Ok(())
  }

  pub fn fitted_theta(&self) -> Result<&[f64]> {
    self
      .theta
      .as_deref()
      .ok_or_else(|| CopulaError::InvalidParameter {
        family: self.kind.name(),
        reason: "no parameters set; fit the copula or call set_theta first".into(),
      })
  }

  pub fn pdf(&self, u: &Array1<f64>, v: &Array1<f64>) -> Result<Array1<f64>> {
    check_unit_pair(u, v)?;
    let theta = self.fitted_theta()?;
    let family = self.kind.family();
    let density = rotate_pdf(self.rotation, move |a, b| family.pdf(a, b, theta));
    Ok(zip_map(u, v, |ui, vi| {
      density(clamp_unit(ui), clamp_unit(vi))
    }))
  }

  pub fn log_pdf(&self, u: &Array1<f64>, v: &Array1<f64>) -> Result<Array1<f64>> {
    Ok(self.pdf(u, v)?.mapv(f64::ln))
  }

  pub fn cdf(&self, u: &Array1<f64>, v: &Array1<f64>) -> Result<Array1<f64>> {
    check_unit_pair(u, v)?;
    let theta = self.fitted_theta()?;
    let family = self.kind.family();
    let distribution = rotate_cdf(self.rotation, move |a, b| family.cdf(a, b, theta));
    Ok(zip_map(u, v, |ui, vi| {
      // Uniform-margin identities hold for every rotation.
      if ui <= 0.0 || vi <= 0.0 {
        0.0
      } else if ui >= 1.0 {
        vi
      } else if vi >= 1.0 {
        ui
      } else {
        distribution(ui, vi)
      }
    }))
  }

  /// Conditional cdf of `v` given `u`.
  pub fn h(&self, v: &Array1<f64>, u: &Array1<f64>) -> Result<Array1<f64>> {
    check_unit_pair(v, u)?;
    let theta = self.fitted_theta()?;
    let family = self.kind.family();
    let conditional = rotate_h(self.rotation, move |a, b| family.h(a, b, theta));
    Ok(zip_map(v, u, |vi, ui| {
      conditional(clamp_unit(vi), clamp_unit(ui))
    }))
  }

  /// Conditional quantile: the `v` solving `h(v, u) = p`.
  pub fn h_inv(&self, p: &Array1<f64>, u: &Array1<f64>) -> Result<Array1<f64>> {
    check_unit_pair(p, u)?;
    let theta = self.fitted_theta()?;
    let family = self.kind.family();
    let quantile = rotate_h_inv(self.rotation, move |a, b| family.h_inv(a, b, theta));
    Ok(zip_map(p, u, |pi, ui| {
      quantile(clamp_unit(pi), clamp_unit(ui))
    }))
  }

  /// Archimedean generator evaluated elementwise on `(0, 1]`.
  pub fn generator(&self, t: &Array1<f64>) -> Result<Array1<f64>> {
    let theta = self.fitted_theta()?;
    let family = self.kind.family();
    if t.iter().any(|x| !x.is_finite() || !(0.0..=1.0).contains(x)) {
      return Err(CopulaError::DomainError(
        "generator argument must lie in (0, 1]".into(),
      ));
    }
    t.iter()
      .map(|&x| {
        family
          .generator(x.max(UNIT_EPS), theta)
          .ok_or_else(|| {
            CopulaError::DomainError(format!(
              "{} has no Archimedean generator",
              family.name()
            ))
          })
      })
      .collect()
  }

  /// Kendall's tau implied by the fitted parameters, sign-adjusted for
  /// the rotation.
  pub fn k_tau(&self) -> Result<f64> {
    let theta = self.fitted_theta()?;
    let tau = self.kind.family().tau(theta);
    Ok(if self.rotation.flips_tau() { -tau } else { tau })
  }

  /// Draws `n` pairs via conditional inversion: `u` uniform, then
  /// `v = h_inv(p, u)` for an independent uniform `p`.
  pub fn sample<R>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>>
  where
    R: Rng + ?Sized,
  {
    let theta = self.fitted_theta()?;
    self.sample_with(n, theta, rng)
  }

  /// Same as [`Copula::sample`] but with explicit parameters.
  pub fn sample_with<R>(&self, n: usize, theta: &[f64], rng: &mut R) -> Result<Array2<f64>>
  where
    R: Rng + ?Sized,
  {
    check_theta(self.kind.family(), theta)?;
    let family = self.kind.family();
    let quantile = rotate_h_inv(self.rotation, move |a, b| family.h_inv(a, b, theta));

    let uniform = Uniform::new(UNIT_EPS, 1.0 - UNIT_EPS);
    let u = Array1::random_using(n, uniform, rng);
    let p = Array1::random_using(n, uniform, rng);
    let v = zip_map(&p, &u, |pi, ui| quantile(pi, ui));

    Ok(stack![Axis(1), u, v])
  }

  /// Density sampled at the midpoints of a `resolution^2` grid.
  pub fn density_grid(&self, resolution: usize) -> Result<(Array1<f64>, Array2<f64>)> {
    if resolution == 0 {
      return Err(CopulaError::DomainError(
        "grid resolution must be positive".into(),
      ));
    }
    let theta = self.fitted_theta()?;
    let family = self.kind.family();
    let density = rotate_pdf(self.rotation, move |a, b| family.pdf(a, b, theta));

    let nodes =
      Array1::from_iter((0..resolution).map(|i| (i as f64 + 0.5) / resolution as f64));
    let mut z = Array2::zeros((resolution, resolution));
    for i in 0..resolution {
      for j in 0..resolution {
        z[[i, j]] = density(nodes[i], nodes[j]);
      }
    }

    Ok((nodes, z))
  }
}
