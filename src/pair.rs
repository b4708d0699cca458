//! # Pairwise model selection
//!
//! Every family/rotation combination is fitted to the same
//! pseudo-observations in parallel and ranked by information criterion;
//! the scan over results is sequential so selection is deterministic.
use ndarray::Array1;
use rayon::prelude::*;
use tracing::debug;
use tracing::info;

use crate::bivariate::Copula;
use crate::bivariate::CopulaType;
use crate::calibration::fit_candidate;
use crate::calibration::FittedCandidate;
use crate::calibration::InformationCriterion;
use crate::correlation::kendall_tau;
use crate::empirical::pseudo_observations;
use crate::error::CopulaError;
use crate::error::Result;
use crate::rotation::Rotation;

/// Below this sample size no candidate likelihood is worth ranking.
pub const MIN_SAMPLES: usize = 10;

/// Scores within this distance are treated as ties and resolved by
/// parsimony, then by rotation index.
const SCORE_TIE_TOL: f64 = 1e-3;

/// Outcome of a tournament, kept separate from the model so callers can
/// report it without holding the copula itself.
#[derive(Clone, Debug)]
pub struct FitSummary {
  pub family: &'static str,
  pub rotation: Rotation,
  pub theta: Vec<f64>,
  pub log_likelihood: f64,
  pub aic: f64,
  pub bic: f64,
  pub score: f64,
}

/// The full family/rotation grid entered into a tournament.
pub fn default_candidates() -> Vec<(CopulaType, Rotation)> {
  CopulaType::ALL
    .iter()
    .flat_map(|&kind| {
      kind
        .family()
        .rotations()
        .iter()
        .map(move |&rotation| (kind, rotation))
    })
    .collect()
}

fn pick_better(
  best: &FittedCandidate,
  challenger: &FittedCandidate,
  criterion: InformationCriterion,
) -> bool {
  let delta = challenger.score(criterion) - best.score(criterion);
  if delta < -SCORE_TIE_TOL {
    return true;
  }
  if delta.abs() <= SCORE_TIE_TOL {
    let best_params = best.copula.family().param_count();
    let challenger_params = challenger.copula.family().param_count();
    if challenger_params < best_params {
      return true;
    }
    if challenger_params == best_params
      && challenger.copula.rotation().index() < best.copula.rotation().index()
    {
      return true;
    }
  }
  false
}

/// A bivariate sample together with its fitted dependence model.
#[derive(Clone, Debug)]
pub struct PairCopula {
  x: Array1<f64>,
  y: Array1<f64>,
  u: Array1<f64>,
  v: Array1<f64>,
  empirical_tau: f64,
  criterion: InformationCriterion,
  model: Option<Copula>,
  summary: Option<FitSummary>,
}

impl PairCopula {
  pub fn new(x: &Array1<f64>, y: &Array1<f64>) -> Result<Self> {
    if x.len() != y.len() {
      return Err(CopulaError::DataInsufficiency(format!(
        "sample lengths differ: {} vs {}",
        x.len(),
        y.len()
      )));
    }
    if x.len() < MIN_SAMPLES {
      return Err(CopulaError::DataInsufficiency(format!(
        "{} samples, need at least {}",
        x.len(),
        MIN_SAMPLES
      )));
    }
    let constant = |s: &Array1<f64>| s.iter().all(|&a| a == s[0]);
    if constant(x) || constant(y) {
      return Err(CopulaError::DataInsufficiency(
        "constant sample has no dependence structure".into(),
      ));
    }

    let u = pseudo_observations(x)?;
    let v = pseudo_observations(y)?;
    let empirical_tau = kendall_tau(&u, &v)?;

    Ok(Self {
      x: x.clone(),
      y: y.clone(),
      u,
      v,
      empirical_tau,
      criterion: InformationCriterion::default(),
      model: None,
      summary: None,
    })
  }

  pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
    self.criterion = criterion;
    self
  }

  pub fn raw(&self) -> (&Array1<f64>, &Array1<f64>) {
    (&self.x, &self.y)
  }

  pub fn pseudo_observations(&self) -> (&Array1<f64>, &Array1<f64>) {
    (&self.u, &self.v)
  }

  pub fn empirical_tau(&self) -> f64 {
    self.empirical_tau
  }

  pub fn model(&self) -> Option<&Copula> {
    self.model.as_ref()
  }

  pub fn summary(&self) -> Option<&FitSummary> {
    self.summary.as_ref()
  }

  /// Fits every candidate and keeps the best score.
  ///
  /// Failed candidates are logged and excluded; the tournament only
  /// errors when no candidate at all could be fitted.
  pub fn tournament(&mut self) -> Result<&FitSummary> {
    let candidates = default_candidates();
    let results: Vec<Result<FittedCandidate>> = candidates
      .par_iter()
      .map(|&(kind, rotation)| fit_candidate(kind, rotation, &self.u, &self.v, self.empirical_tau))
      .collect();

    let mut best: Option<FittedCandidate> = None;
    for (&(kind, rotation), result) in candidates.iter().zip(results) {
      match result {
        Ok(candidate) => {
          let score = candidate.score(self.criterion);
          debug!(
            family = kind.name(),
            rotation = ?rotation,
            score,
            log_likelihood = candidate.log_likelihood,
            "fitted candidate"
          );
          match &best {
            Some(current) if !pick_better(current, &candidate, self.criterion) => {}
            _ => best = Some(candidate),
          }
        }
        Err(err) => {
          debug!(family = kind.name(), rotation = ?rotation, %err, "candidate excluded");
        }
      }
    }

    let winner = best.ok_or_else(|| {
      CopulaError::FitFailure("every tournament candidate failed to fit".into())
    })?;

    let summary = FitSummary {
      family: winner.copula.kind().name(),
      rotation: winner.copula.rotation(),
      theta: winner.copula.fitted_theta()?.to_vec(),
      log_likelihood: winner.log_likelihood,
      aic: winner.aic,
      bic: winner.bic,
      score: winner.score(self.criterion),
    };
    info!(
      family = summary.family,
      rotation = ?summary.rotation,
      score = summary.score,
      "tournament winner"
    );

    self.model = Some(winner.copula);
    Ok(self.summary.insert(summary))
  }

  /// Kendall's tau implied by the selected model.
  pub fn k_tau(&self) -> Result<f64> {
    self.fitted()?.k_tau()
  }

  pub fn into_fitted(self) -> Result<Copula> {
    self.model.ok_or_else(not_fitted)
  }

  fn fitted(&self) -> Result<&Copula> {
    self.model.as_ref().ok_or_else(not_fitted)
  }
}

fn not_fitted() -> CopulaError {
  CopulaError::InvalidParameter {
    family: "pair_copula",
    reason: "run the tournament before using the model".into(),
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::Array1;
  use ndarray_rand::RandomExt;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::Uniform;
  use tracing_test::traced_test;

  use super::*;

  fn sampled_pair(kind: CopulaType, rotation: Rotation, theta: &[f64], n: usize, seed: u64) -> PairCopula {
    let mut rng = StdRng::seed_from_u64(seed);
    let truth = Copula::with_theta(kind, rotation, theta).unwrap();
    let draws = truth.sample(n, &mut rng).unwrap();
    PairCopula::new(&draws.column(0).to_owned(), &draws.column(1).to_owned()).unwrap()
  }

  #[test]
  fn candidate_grid_covers_families_and_rotations() {
    let candidates = default_candidates();
    assert_eq!(candidates.len(), 15);
    assert_eq!(candidates[0], (CopulaType::Gaussian, Rotation::R0));
    let franks = candidates
      .iter()
      .filter(|(kind, _)| *kind == CopulaType::Frank)
      .count();
    assert_eq!(franks, 4);
    assert!(candidates.contains(&(CopulaType::Independence, Rotation::R0)));
  }

  #[test]
  fn mismatched_and_short_samples_are_rejected() {
    let long = Array1::linspace(0.0, 1.0, 20);
    let short = Array1::linspace(0.0, 1.0, 5);
    assert!(matches!(
      PairCopula::new(&long, &short).unwrap_err(),
      CopulaError::DataInsufficiency(_)
    ));
    assert!(matches!(
      PairCopula::new(&short, &short).unwrap_err(),
      CopulaError::DataInsufficiency(_)
    ));
  }

  #[test]
  fn constant_samples_are_rejected() {
    let flat = Array1::from_elem(50, 3.25);
    let moving = Array1::linspace(0.0, 1.0, 50);
    assert!(matches!(
      PairCopula::new(&flat, &moving).unwrap_err(),
      CopulaError::DataInsufficiency(_)
    ));
  }

  #[test]
  fn model_access_before_the_tournament_fails() {
    let x = Array1::linspace(0.0, 1.0, 30);
    let y = Array1::linspace(1.0, 2.0, 30);
    let pair = PairCopula::new(&x, &y).unwrap();
    assert!(pair.model().is_none());
    assert!(pair.summary().is_none());
    assert!(pair.k_tau().is_err());
    assert!(pair.into_fitted().is_err());
  }

  #[test]
  fn frank_dependence_is_recovered_end_to_end() {
    let mut pair = sampled_pair(CopulaType::Frank, Rotation::R0, &[8.0], 10000, 17);
    let summary = pair.tournament().unwrap().clone();

    assert_eq!(summary.family, "frank");
    assert_eq!(summary.rotation, Rotation::R0);
    assert_abs_diff_eq!(summary.theta[0], 8.0, epsilon = 0.2);
    assert!(summary.log_likelihood > 0.0);

    let tau = pair.k_tau().unwrap();
    assert_abs_diff_eq!(tau, 0.602619667, epsilon = 0.02);
    assert_abs_diff_eq!(tau, pair.empirical_tau(), epsilon = 0.03);
  }

  #[test]
  fn gaussian_dependence_is_preferred_over_heavier_families() {
    let mut pair = sampled_pair(CopulaType::Gaussian, Rotation::R0, &[0.7], 8000, 29);
    let summary = pair.tournament().unwrap().clone();

    assert_eq!(summary.family, "gaussian");
    assert_abs_diff_eq!(summary.theta[0], 0.7, epsilon = 0.05);
  }

  #[test]
  fn rotated_clayton_wins_on_negative_tail_dependence() {
    let mut pair = sampled_pair(CopulaType::Clayton, Rotation::R90, &[3.0], 6000, 31);
    assert!(pair.empirical_tau() < -0.4);

    let summary = pair.tournament().unwrap().clone();
    assert_eq!(summary.family, "clayton");
    assert_eq!(summary.rotation, Rotation::R90);
    assert_abs_diff_eq!(summary.theta[0], 3.0, epsilon = 0.5);
    assert_abs_diff_eq!(pair.k_tau().unwrap(), -0.6, epsilon = 0.05);
  }

  #[test]
  fn strong_upper_tail_dependence_is_recovered() {
    let mut pair = sampled_pair(CopulaType::Gumbel, Rotation::R0, &[8.0], 20000, 37);
    let summary = pair.tournament().unwrap().clone();

    assert_eq!(summary.family, "gumbel");
    assert_eq!(summary.rotation, Rotation::R0);
    assert_abs_diff_eq!(summary.theta[0], 8.0, epsilon = 0.4);
    assert_abs_diff_eq!(pair.k_tau().unwrap(), 0.875, epsilon = 0.02);
  }

  #[test]
  fn independent_data_selects_the_independence_baseline() {
    let mut rng = StdRng::seed_from_u64(123);
    let x = Array1::random_using(5000, Uniform::new(0.0, 1.0), &mut rng);
    let y = Array1::random_using(5000, Uniform::new(0.0, 1.0), &mut rng);
    let mut pair = PairCopula::new(&x, &y).unwrap();
    let summary = pair.tournament().unwrap().clone();

    assert_eq!(summary.family, "independence");
    assert!(summary.theta.is_empty());
    assert_abs_diff_eq!(pair.k_tau().unwrap(), 0.0);
    assert!(pair.empirical_tau().abs() < 0.03);
  }

  #[test]
  #[traced_test]
  fn tournaments_log_their_winner() {
    let mut pair = sampled_pair(CopulaType::Frank, Rotation::R0, &[6.0], 300, 41);
    pair.tournament().unwrap();
    assert!(logs_contain("tournament winner"));
    assert!(logs_contain("fitted candidate"));
  }

  #[test]
  fn aic_remains_selectable() {
    let pair = sampled_pair(CopulaType::Frank, Rotation::R0, &[6.0], 500, 43);
    let mut pair = pair.with_criterion(InformationCriterion::Aic);
    let summary = pair.tournament().unwrap().clone();
    assert_abs_diff_eq!(summary.score, summary.aic);
  }
}
