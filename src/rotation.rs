//! # Quadrant rotations
//!
//! $$
//! C_{90}(u,v) = u - C(u, 1-v), \quad
//! C_{180}(u,v) = u + v - 1 + C(1-u, 1-v), \quad
//! C_{270}(u,v) = v - C(1-u, v)
//! $$
//!
use crate::error::CopulaError;
use crate::error::Result;

/// Counter-clockwise rotation applied to a copula density.
///
/// Rotating by 90 or 270 degrees mirrors the dependence into the opposite
/// orientation, so families with only positive association still cover
/// negatively associated data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
  #[default]
  R0,
  R90,
  R180,
  R270,
}

impl Rotation {
  pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

  pub fn index(&self) -> usize {
    match self {
      Rotation::R0 => 0,
      Rotation::R90 => 1,
      Rotation::R180 => 2,
      Rotation::R270 => 3,
    }
  }

  pub fn from_index(index: usize) -> Result<Self> {
    Rotation::ALL
      .get(index)
      .copied()
      .ok_or_else(|| CopulaError::DomainError(format!("no rotation with index {}", index)))
  }

  pub fn degrees(&self) -> u16 {
    match self {
      Rotation::R0 => 0,
      Rotation::R90 => 90,
      Rotation::R180 => 180,
      Rotation::R270 => 270,
    }
  }

  /// Whether the rotation negates Kendall's tau.
  pub fn flips_tau(&self) -> bool {
    matches!(self, Rotation::R90 | Rotation::R270)
  }
}

/// Arguments at which the base density is evaluated for a rotated copula.
pub fn rotated_args(rotation: Rotation, u: f64, v: f64) -> (f64, f64) {
  match rotation {
    Rotation::R0 => (u, v),
    Rotation::R90 => (1.0 - v, u),
    Rotation::R180 => (1.0 - u, 1.0 - v),
    Rotation::R270 => (v, 1.0 - u),
  }
}

/// Density of the rotated copula in terms of the base density.
pub fn rotate_pdf<F>(rotation: Rotation, pdf: F) -> impl Fn(f64, f64) -> f64
where
  F: Fn(f64, f64) -> f64,
{
  move |u, v| {
    let (a, b) = rotated_args(rotation, u, v);
    pdf(a, b)
  }
}

/// Distribution function of the rotated copula in terms of the base cdf.
pub fn rotate_cdf<F>(rotation: Rotation, cdf: F) -> impl Fn(f64, f64) -> f64
where
  F: Fn(f64, f64) -> f64,
{
  move |u, v| match rotation {
    Rotation::R0 => cdf(u, v),
    Rotation::R90 => u - cdf(u, 1.0 - v),
    Rotation::R180 => u + v - 1.0 + cdf(1.0 - u, 1.0 - v),
    Rotation::R270 => v - cdf(1.0 - u, v),
  }
}

/// Conditional distribution `h(v, u)` of the rotated copula.
pub fn rotate_h<F>(rotation: Rotation, h: F) -> impl Fn(f64, f64) -> f64
where
  F: Fn(f64, f64) -> f64,
{
  move |v, u| match rotation {
    Rotation::R0 => h(v, u),
    Rotation::R90 => 1.0 - h(1.0 - v, u),
    Rotation::R180 => 1.0 - h(1.0 - v, 1.0 - u),
    Rotation::R270 => h(v, 1.0 - u),
  }
}

/// Conditional quantile `h^{-1}(p, u)` of the rotated copula.
pub fn rotate_h_inv<F>(rotation: Rotation, h_inv: F) -> impl Fn(f64, f64) -> f64
where
  F: Fn(f64, f64) -> f64,
{
  move |p, u| match rotation {
    Rotation::R0 => h_inv(p, u),
    Rotation::R90 => 1.0 - h_inv(1.0 - p, u),
    Rotation::R180 => 1.0 - h_inv(1.0 - p, 1.0 - u),
    Rotation::R270 => h_inv(p, 1.0 - u),
  }
}
