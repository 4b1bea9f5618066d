//! Evaluation grids: synthetic covariate rows to evaluate effects at.
//!
//! ```rust,ignore
//! use margins_rs::grid::{datagrid, GridValue, Summary};
//!
//! // hp at 100 and 200, wt at its three representative values,
//! // everything else at its mean (mode for 0/1 columns): 2 × 3 rows
//! let grid = datagrid(&model)
//!     .set("hp", GridValue::Values(vec![100.0, 200.0]))
//!     .set("wt", GridValue::Summary(Summary::ThreeNum))
//!     .build()?;
//! ```

mod builder;

pub use builder::{datagrid, DataGrid, GridError, GridValue, Summary};
