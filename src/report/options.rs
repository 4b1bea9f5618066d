//! Presentation options for rendered reports.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Text layout for result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// Markdown pipe table.
    #[default]
    Pipe,
    /// Box-drawn grid table.
    Grid,
    /// Whitespace-aligned columns, as R prints data frames.
    Compact,
}

/// Placement specifier for LaTeX figure floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatPlacement {
    /// `[H]`: exactly here (needs the `float` package).
    #[default]
    Here,
    /// `[t]`: top of a page.
    Top,
    /// `[htbp]`: let LaTeX decide.
    Auto,
}

impl FloatPlacement {
    pub fn specifier(self) -> &'static str {
        match self {
            Self::Here => "[H]",
            Self::Top => "[t]",
            Self::Auto => "[htbp]",
        }
    }
}

/// Document output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Latex,
}

/// Errors that can occur when validating report options.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReportOptionsError {
    #[error("digits must be between 1 and 15, got {0}")]
    InvalidDigits(usize),
    #[error("figure width must be positive, got {0}")]
    InvalidWidth(f64),
    #[error("figure height must be positive, got {0}")]
    InvalidHeight(f64),
    #[error("unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },
}

/// Rendering configuration. Affects presentation only, never computation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub table_style: TableStyle,
    pub float_placement: FloatPlacement,
    pub format: OutputFormat,
    /// Significant digits for estimates (default: 3).
    pub digits: usize,
    /// Figure size in pixels.
    pub figure_width: f64,
    pub figure_height: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            table_style: TableStyle::Pipe,
            float_placement: FloatPlacement::Here,
            format: OutputFormat::Markdown,
            digits: 3,
            figure_width: 720.0,
            figure_height: 300.0,
        }
    }
}

impl ReportOptions {
    pub fn builder() -> ReportOptionsBuilder {
        ReportOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ReportOptionsError> {
        if !(1..=15).contains(&self.digits) {
            return Err(ReportOptionsError::InvalidDigits(self.digits));
        }
        if !(self.figure_width > 0.0) {
            return Err(ReportOptionsError::InvalidWidth(self.figure_width));
        }
        if !(self.figure_height > 0.0) {
            return Err(ReportOptionsError::InvalidHeight(self.figure_height));
        }
        Ok(())
    }
}

/// Builder for [`ReportOptions`].
#[derive(Debug, Clone, Default)]
pub struct ReportOptionsBuilder {
    options: ReportOptions,
}

impl ReportOptionsBuilder {
    pub fn table_style(mut self, style: TableStyle) -> Self {
        self.options.table_style = style;
        self
    }

    pub fn float_placement(mut self, placement: FloatPlacement) -> Self {
        self.options.float_placement = placement;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.options.format = format;
        self
    }

    pub fn digits(mut self, digits: usize) -> Self {
        self.options.digits = digits;
        self
    }

    pub fn figure_size(mut self, width: f64, height: f64) -> Self {
        self.options.figure_width = width;
        self.options.figure_height = height;
        self
    }

    pub fn build(self) -> Result<ReportOptions, ReportOptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

impl FromStr for TableStyle {
    type Err = ReportOptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pipe" => Ok(Self::Pipe),
            "grid" => Ok(Self::Grid),
            "compact" => Ok(Self::Compact),
            _ => Err(ReportOptionsError::UnknownValue {
                kind: "table style",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for FloatPlacement {
    type Err = ReportOptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "here" | "h" => Ok(Self::Here),
            "top" | "t" => Ok(Self::Top),
            "auto" | "htbp" => Ok(Self::Auto),
            _ => Err(ReportOptionsError::UnknownValue {
                kind: "float placement",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ReportOptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "latex" | "tex" => Ok(Self::Latex),
            _ => Err(ReportOptionsError::UnknownValue {
                kind: "output format",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TableStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pipe => "pipe",
            Self::Grid => "grid",
            Self::Compact => "compact",
        })
    }
}
