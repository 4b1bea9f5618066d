//! Options for predictions, comparisons and slopes.

use super::comparisons::{ComparisonFn, Contrast};
use super::slopes::SlopeKind;
use super::EffectsError;
use crate::data::Dataset;
use crate::inference::Hypothesis;

/// How unit-level estimates are averaged.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum By {
    /// Keep one row per unit.
    #[default]
    None,
    /// One row per term (and contrast).
    All,
    /// One row per term and combination of these grid columns.
    Columns(Vec<String>),
}

impl By {
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }
}

/// Monotone transform applied to estimates and interval bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Exp,
    Ln,
}

impl Transform {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
        }
    }
}

/// Post-processing shared by every effects call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOptions {
    pub by: By,
    pub hypothesis: Option<Hypothesis>,
    pub transform: Option<Transform>,
    /// Confidence level for intervals (default: 0.95).
    pub conf_level: f64,
    /// Degrees of freedom for Student t; the standard normal when `None`.
    pub df: Option<f64>,
    /// Equivalence bounds `(low, high)`.
    pub equivalence: Option<(f64, f64)>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            by: By::None,
            hypothesis: None,
            transform: None,
            conf_level: 0.95,
            df: None,
            equivalence: None,
        }
    }
}

impl InferenceOptions {
    pub fn validate(&self) -> Result<(), EffectsError> {
        if !(self.conf_level > 0.0 && self.conf_level < 1.0) {
            return Err(EffectsError::InvalidConfLevel(self.conf_level));
        }
        if let Some(df) = self.df {
            if !(df.is_finite() && df > 0.0) {
                return Err(EffectsError::InvalidDf(df));
            }
        }
        if let Some((low, high)) = self.equivalence {
            if !(low < high) {
                return Err(EffectsError::InvalidBounds { low, high });
            }
        }
        if let By::Columns(columns) = &self.by {
            if columns.is_empty() {
                return Err(EffectsError::EmptyBy);
            }
        }
        Ok(())
    }
}

/// Options for [`predictions`](super::predictions).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionOptions {
    /// Evaluation grid; the training data when `None`.
    pub newdata: Option<Dataset>,
    pub inference: InferenceOptions,
}

/// Options for [`comparisons`](super::comparisons).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonOptions {
    /// Variables and their contrasts; every predictor with
    /// [`Contrast::Default`] when empty.
    pub variables: Vec<(String, Contrast)>,
    pub newdata: Option<Dataset>,
    pub comparison: ComparisonFn,
    pub inference: InferenceOptions,
}

/// Options for [`slopes`](super::slopes).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlopeOptions {
    /// Variables to differentiate; every predictor when empty.
    pub variables: Vec<String>,
    pub newdata: Option<Dataset>,
    pub slope: SlopeKind,
    pub inference: InferenceOptions,
}

impl PredictionOptions {
    pub fn builder() -> PredictionOptionsBuilder {
        PredictionOptionsBuilder::default()
    }
}

impl ComparisonOptions {
    pub fn builder() -> ComparisonOptionsBuilder {
        ComparisonOptionsBuilder::default()
    }
}

impl SlopeOptions {
    pub fn builder() -> SlopeOptionsBuilder {
        SlopeOptionsBuilder::default()
    }
}

/// Builder for [`InferenceOptions`], embedded in the per-call builders.
#[derive(Debug, Clone, Default)]
pub struct InferenceOptionsBuilder {
    options: InferenceOptions,
}

impl InferenceOptionsBuilder {
    pub fn by(mut self, by: By) -> Self {
        self.options.by = by;
        self
    }

    pub fn hypothesis(mut self, hypothesis: impl Into<Hypothesis>) -> Self {
        self.options.hypothesis = Some(hypothesis.into());
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.options.transform = Some(transform);
        self
    }

    pub fn conf_level(mut self, level: f64) -> Self {
        self.options.conf_level = level;
        self
    }

    pub fn df(mut self, df: f64) -> Self {
        self.options.df = Some(df);
        self
    }

    pub fn equivalence(mut self, low: f64, high: f64) -> Self {
        self.options.equivalence = Some((low, high));
        self
    }

    pub fn build(self) -> Result<InferenceOptions, EffectsError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Builder for [`PredictionOptions`].
#[derive(Debug, Clone, Default)]
pub struct PredictionOptionsBuilder {
    newdata: Option<Dataset>,
    inference: InferenceOptionsBuilder,
}

impl PredictionOptionsBuilder {
    pub fn newdata(mut self, newdata: Dataset) -> Self {
        self.newdata = Some(newdata);
        self
    }

    pub fn by(mut self, by: By) -> Self {
        self.inference = self.inference.by(by);
        self
    }

    pub fn hypothesis(mut self, hypothesis: impl Into<Hypothesis>) -> Self {
        self.inference = self.inference.hypothesis(hypothesis);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.inference = self.inference.transform(transform);
        self
    }

    pub fn conf_level(mut self, level: f64) -> Self {
        self.inference = self.inference.conf_level(level);
        self
    }

    pub fn df(mut self, df: f64) -> Self {
        self.inference = self.inference.df(df);
        self
    }

    pub fn equivalence(mut self, low: f64, high: f64) -> Self {
        self.inference = self.inference.equivalence(low, high);
        self
    }

    pub fn build(self) -> Result<PredictionOptions, EffectsError> {
        Ok(PredictionOptions {
            newdata: self.newdata,
            inference: self.inference.build()?,
        })
    }
}

/// Builder for [`ComparisonOptions`].
#[derive(Debug, Clone, Default)]
pub struct ComparisonOptionsBuilder {
    variables: Vec<(String, Contrast)>,
    newdata: Option<Dataset>,
    comparison: ComparisonFn,
    inference: InferenceOptionsBuilder,
}

impl ComparisonOptionsBuilder {
    /// Compare `name` across `contrast`. Repeat for several variables.
    pub fn variable(mut self, name: impl Into<String>, contrast: Contrast) -> Self {
        self.variables.push((name.into(), contrast));
        self
    }

    pub fn newdata(mut self, newdata: Dataset) -> Self {
        self.newdata = Some(newdata);
        self
    }

    pub fn comparison(mut self, comparison: ComparisonFn) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn by(mut self, by: By) -> Self {
        self.inference = self.inference.by(by);
        self
    }

    pub fn hypothesis(mut self, hypothesis: impl Into<Hypothesis>) -> Self {
        self.inference = self.inference.hypothesis(hypothesis);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.inference = self.inference.transform(transform);
        self
    }

    pub fn conf_level(mut self, level: f64) -> Self {
        self.inference = self.inference.conf_level(level);
        self
    }

    pub fn df(mut self, df: f64) -> Self {
        self.inference = self.inference.df(df);
        self
    }

    pub fn equivalence(mut self, low: f64, high: f64) -> Self {
        self.inference = self.inference.equivalence(low, high);
        self
    }

    pub fn build(self) -> Result<ComparisonOptions, EffectsError> {
        Ok(ComparisonOptions {
            variables: self.variables,
            newdata: self.newdata,
            comparison: self.comparison,
            inference: self.inference.build()?,
        })
    }
}

/// Builder for [`SlopeOptions`].
#[derive(Debug, Clone, Default)]
pub struct SlopeOptionsBuilder {
    variables: Vec<String>,
    newdata: Option<Dataset>,
    slope: SlopeKind,
    inference: InferenceOptionsBuilder,
}

impl SlopeOptionsBuilder {
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.variables.push(name.into());
        self
    }

    pub fn newdata(mut self, newdata: Dataset) -> Self {
        self.newdata = Some(newdata);
        self
    }

    pub fn slope(mut self, slope: SlopeKind) -> Self {
        self.slope = slope;
        self
    }

    pub fn by(mut self, by: By) -> Self {
        self.inference = self.inference.by(by);
        self
    }

    pub fn hypothesis(mut self, hypothesis: impl Into<Hypothesis>) -> Self {
        self.inference = self.inference.hypothesis(hypothesis);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.inference = self.inference.transform(transform);
        self
    }

    pub fn conf_level(mut self, level: f64) -> Self {
        self.inference = self.inference.conf_level(level);
        self
    }

    pub fn df(mut self, df: f64) -> Self {
        self.inference = self.inference.df(df);
        self
    }

    pub fn equivalence(mut self, low: f64, high: f64) -> Self {
        self.inference = self.inference.equivalence(low, high);
        self
    }

    pub fn build(self) -> Result<SlopeOptions, EffectsError> {
        Ok(SlopeOptions {
            variables: self.variables,
            newdata: self.newdata,
            slope: self.slope,
            inference: self.inference.build()?,
        })
    }
}
