//! Statistical inference: covariance matrices, the delta method, test
//! statistics, hypothesis and equivalence tests.

mod coefficient;
mod covariance;
mod delta;
mod equivalence;
mod hypothesis;
mod reference;

pub use coefficient::CoefficientInference;
pub use covariance::{
    augment_with_intercept, compute_xtx_inverse, ols_covariance, sandwich_diagonal,
};
pub use delta::{linear_predictor, standard_errors, DeltaMethod};
pub use equivalence::EquivalenceResult;
pub use hypothesis::{Contrasts, Hypothesis, HypothesisError};
pub use reference::ReferenceDistribution;
