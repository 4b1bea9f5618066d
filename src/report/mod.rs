//! Rendering of result tables, prediction charts and whole documents.

mod document;
mod options;
mod plot;
mod session;
mod table;

pub use document::{Cell, Document};
pub use options::{
    FloatPlacement, OutputFormat, ReportOptions, ReportOptionsBuilder, ReportOptionsError,
    TableStyle,
};
pub use plot::{plot_predictions, render_svg, Condition, PlotData, PlotPoint, Series};
pub use session::{DependencyInfo, SessionInfo};
pub use table::{format_table, format_table_with};

use crate::effects::EffectsError;
use crate::grid::GridError;
use crate::solvers::ModelError;
use thiserror::Error;

/// Errors that can occur while rendering or assembling a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot format an empty table")]
    EmptyTable,

    #[error("unsupported plot: {0}")]
    UnsupportedPlot(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Effects(#[from] EffectsError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Options(#[from] ReportOptionsError),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<crate::data::DataError> for ReportError {
    fn from(err: crate::data::DataError) -> Self {
        Self::Grid(GridError::Data(err))
    }
}
