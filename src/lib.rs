//! # Vinecop
//!
//! $$
//! c(u_1,\dots,u_d)=\prod_{j=1}^{d-1}\prod_{i=j+1}^{d} c_{j,i\mid 1,\dots,j-1}
//! $$
//!
//! Bivariate copula families with rotations, pseudo-observations and
//! Kendall's tau, maximum-likelihood calibration, tournament model
//! selection and canonical vine construction.
pub mod bivariate;
pub mod calibration;
pub mod correlation;
pub mod empirical;
pub mod error;
pub mod pair;
pub mod rotation;
pub mod vine;

pub use bivariate::Bivariate;
pub use bivariate::Copula;
pub use bivariate::CopulaType;
pub use calibration::FittedCandidate;
pub use calibration::InformationCriterion;
pub use error::CopulaError;
pub use error::Result;
pub use pair::FitSummary;
pub use pair::PairCopula;
pub use rotation::Rotation;
pub use vine::CVine;
pub use vine::VineEdge;
pub use vine::VineLevel;
pub use vine::VineState;
