//! # Canonical vine
//!
//! A C-vine couples $ d $ variables through $ d(d-1)/2 $ bivariate
//! copulas arranged in levels. Each level picks the variable with the
//! largest total dependence as its root, fits one pair copula per
//! remaining variable and conditions the survivors on the root through
//! the h-function before the next level starts.
use ndarray::Array1;
use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;
use tracing::debug;
use tracing::info;

use crate::bivariate::Copula;
use crate::bivariate::UNIT_EPS;
use crate::calibration::InformationCriterion;
use crate::correlation::kendall_tau;
use crate::empirical::pseudo_observations;
use crate::error::CopulaError;
use crate::error::Result;
use crate::pair::FitSummary;
use crate::pair::PairCopula;
use crate::pair::MIN_SAMPLES;

/// Construction progress, kept around so a failed construction is
/// distinguishable from one that never started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VineState {
  Unconstructed,
  Constructing(usize),
  Constructed,
}

/// One fitted pair inside a level, conditioning `other` on `root`.
#[derive(Clone, Debug)]
pub struct VineEdge {
  pub level: usize,
  pub root: usize,
  pub other: usize,
  pub copula: Copula,
  pub summary: FitSummary,
}

#[derive(Clone, Debug)]
pub struct VineLevel {
  pub root: usize,
  pub edges: Vec<VineEdge>,
}

/// Canonical vine over the columns of a data matrix.
///
/// Variable indices in edges and in the root order always refer to the
/// original column positions, whatever order the roots are chosen in.
#[derive(Clone, Debug)]
pub struct CVine {
  data: Array2<f64>,
  criterion: InformationCriterion,
  state: VineState,
  levels: Vec<VineLevel>,
  root_order: Vec<usize>,
}

impl CVine {
  pub fn new(data: &Array2<f64>) -> Result<Self> {
    if data.ncols() < 2 {
      return Err(CopulaError::DataInsufficiency(format!(
        "a vine needs at least 2 variables, got {}",
        data.ncols()
      )));
    }
    if data.nrows() < MIN_SAMPLES {
      return Err(CopulaError::DataInsufficiency(format!(
        "{} samples, need at least {}",
        data.nrows(),
        MIN_SAMPLES
      )));
    }
    Ok(Self {
      data: data.clone(),
      criterion: InformationCriterion::default(),
      state: VineState::Unconstructed,
      levels: Vec::new(),
      root_order: Vec::new(),
    })
  }

  pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
    self.criterion = criterion;
    self
  }

  pub fn state(&self) -> VineState {
    self.state
  }

  pub fn dim(&self) -> usize {
    self.data.ncols()
  }

  pub fn levels(&self) -> &[VineLevel] {
    &self.levels
  }

  pub fn root_order(&self) -> &[usize] {
    &self.root_order
  }

  pub fn edge_count(&self) -> usize {
    self.levels.iter().map(|level| level.edges.len()).sum()
  }

  pub fn edge(&self, level: usize, variable: usize) -> Option<&VineEdge> {
    self
      .levels
      .get(level)
      .and_then(|l| l.edges.iter().find(|edge| edge.other == variable))
  }

  pub fn summaries(&self) -> Vec<&FitSummary> {
    self
      .levels
      .iter()
      .flat_map(|level| level.edges.iter().map(|edge| &edge.summary))
      .collect()
  }

  /// Builds the vine level by level.
  ///
  /// Level $ k $ fits $ d - 1 - k $ edges against the level root; the
  /// surviving variables enter the next level as $ h(\cdot \mid root) $.
  pub fn construct(&mut self) -> Result<()> {
    let dim = self.dim();
    let mut working: Vec<(usize, Array1<f64>)> = Vec::with_capacity(dim);
    for (variable, column) in self.data.columns().into_iter().enumerate() {
      working.push((variable, pseudo_observations(&column.to_owned())?));
    }

    let mut levels = Vec::with_capacity(dim - 1);
    let mut root_order = Vec::with_capacity(dim);

    for level in 0..dim - 1 {
      self.state = VineState::Constructing(level);
      let root_position = most_dependent(&working)?;
      let (root_variable, root_values) = working.remove(root_position);

      let mut edges = Vec::with_capacity(working.len());
      let mut conditioned = Vec::with_capacity(working.len());
      for (other_variable, other_values) in &working {
        let mut pair =
          PairCopula::new(&root_values, other_values)?.with_criterion(self.criterion);
        let summary = pair.tournament()?.clone();
        debug!(
          level,
          root = root_variable,
          other = *other_variable,
          family = summary.family,
          "vine edge fitted"
        );
        let (root_u, other_v) = pair.pseudo_observations();
        let (root_u, other_v) = (root_u.clone(), other_v.clone());
        let copula = pair.into_fitted()?;
        conditioned.push((*other_variable, copula.h(&other_v, &root_u)?));
        edges.push(VineEdge {
          level,
          root: root_variable,
          other: *other_variable,
          copula,
          summary,
        });
      }

      info!(level, root = root_variable, edges = edges.len(), "vine level constructed");
      levels.push(VineLevel { root: root_variable, edges });
      root_order.push(root_variable);
      working = conditioned;
    }

    if let Some((last_variable, _)) = working.pop() {
      root_order.push(last_variable);
    }

    self.levels = levels;
    self.root_order = root_order;
    self.state = VineState::Constructed;
    Ok(())
  }

  /// Draws joint pseudo-observations from the constructed vine.
  ///
  /// Inverts the construction: the uniform drawn for a root variable is
  /// its value conditioned down to the level it rooted, so every other
  /// variable is rebuilt by chaining $ h^{-1} $ back through the
  /// levels it was conditioned on.
  pub fn sample<R>(&self, n: usize, rng: &mut R) -> Result<Array2<f64>>
  where
    R: Rng + ?Sized,
  {
    self.require_constructed()?;
    let dim = self.dim();
    let w = Array2::random_using((n, dim), Uniform::new(UNIT_EPS, 1.0 - UNIT_EPS), rng);
    let w_columns: Vec<Array1<f64>> = (0..dim).map(|level| w.column(level).to_owned()).collect();

    let mut out = Array2::zeros((n, dim));
    for (exit, &variable) in self.root_order.iter().enumerate() {
      let mut values = w_columns[exit].clone();
      for level in (0..exit).rev() {
        let edge = self
          .edge(level, variable)
          .ok_or_else(|| missing_edge(level, variable))?;
        values = edge.copula.h_inv(&values, &w_columns[level])?;
      }
      out.column_mut(variable).assign(&values);
    }
    Ok(out)
  }

  /// Joint copula log-density, one value per row of `data`.
  ///
  /// Replays the construction on the pseudo-observations of `data`,
  /// accumulating each edge's log-density before conditioning.
  pub fn log_pdf(&self, data: &Array2<f64>) -> Result<Array1<f64>> {
    self.require_constructed()?;
    if data.ncols() != self.dim() {
      return Err(CopulaError::DataInsufficiency(format!(
        "expected {} columns, got {}",
        self.dim(),
        data.ncols()
      )));
    }

    let mut values: Vec<Array1<f64>> = Vec::with_capacity(self.dim());
    for column in data.columns() {
      values.push(pseudo_observations(&column.to_owned())?);
    }

    let mut acc = Array1::zeros(data.nrows());
    for level in &self.levels {
      let root_values = values[level.root].clone();
      for edge in &level.edges {
        acc += &edge.copula.log_pdf(&root_values, &values[edge.other])?;
        values[edge.other] = edge.copula.h(&values[edge.other], &root_values)?;
      }
    }
    Ok(acc)
  }

  fn require_constructed(&self) -> Result<()> {
    match self.state {
      VineState::Constructed => Ok(()),
      _ => Err(CopulaError::InvalidParameter {
        family: "cvine",
        reason: "construct the vine first".into(),
      }),
    }
  }
}

/// Position of the variable with the largest sum of absolute Kendall
/// taus against the rest; ties keep the earliest position.
fn most_dependent(working: &[(usize, Array1<f64>)]) -> Result<usize> {
  let mut strength = vec![0.0; working.len()];
  for i in 0..working.len() {
    for j in i + 1..working.len() {
      let tau = kendall_tau(&working[i].1, &working[j].1)?;
      strength[i] += tau.abs();
      strength[j] += tau.abs();
    }
  }
  let mut best = 0;
  for (position, &value) in strength.iter().enumerate() {
    if value > strength[best] {
      best = position;
    }
  }
  Ok(best)
}

fn missing_edge(level: usize, variable: usize) -> CopulaError {
  CopulaError::DomainError(format!("no edge for variable {variable} at level {level}"))
}
