//! Conditional prediction plots.
//!
//! [`plot_predictions`] evaluates the model on a grid that sweeps one
//! predictor across its observed range, optionally crossed with a colour
//! variable and a facet variable, and [`render_svg`] draws the result.

use super::table::format_number;
use super::ReportError;
use crate::effects::{predictions, EffectsTable, PredictionOptions};
use crate::grid::{datagrid, GridValue, Summary};
use crate::solvers::LinearModel;
use std::fmt::Write;
use tracing::debug;

/// Number of points along the x axis.
const X_POINTS: usize = 50;

/// Variables distinct-valued up to this count default to one line each.
const MAX_DISCRETE: usize = 5;

const PALETTE: [&str; 6] = [
    "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02",
];

/// Up to three plotting variables: x axis, colour, facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    variables: Vec<(String, Option<GridValue>)>,
}

impl Condition {
    /// Start with the x-axis variable.
    pub fn new(x: impl Into<String>) -> Self {
        Self {
            variables: vec![(x.into(), None)],
        }
    }

    /// Add a variable with its default values: every distinct value when
    /// there are at most five, otherwise mean and mean ± sd.
    pub fn by(mut self, name: impl Into<String>) -> Self {
        self.variables.push((name.into(), None));
        self
    }

    /// Add a variable with explicit values.
    pub fn by_values(mut self, name: impl Into<String>, values: GridValue) -> Self {
        self.variables.push((name.into(), Some(values)));
        self
    }
}

/// One point of a prediction curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    pub estimate: f64,
    pub conf_low: f64,
    pub conf_high: f64,
}

/// One curve: fixed colour and facet values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub facet: Option<f64>,
    pub colour: Option<f64>,
    pub points: Vec<PlotPoint>,
}

/// Predictions laid out for plotting.
#[derive(Debug, Clone)]
pub struct PlotData {
    pub table: EffectsTable,
    pub response: String,
    pub x: String,
    pub colour: Option<String>,
    pub facet: Option<String>,
    pub series: Vec<Series>,
}

impl PlotData {
    /// Distinct facet values in order of appearance.
    pub fn facets(&self) -> Vec<Option<f64>> {
        let mut out: Vec<Option<f64>> = Vec::new();
        for s in &self.series {
            if !out.contains(&s.facet) {
                out.push(s.facet);
            }
        }
        out
    }

    /// Distinct colour values in order of appearance.
    pub fn colours(&self) -> Vec<Option<f64>> {
        let mut out: Vec<Option<f64>> = Vec::new();
        for s in &self.series {
            if !out.contains(&s.colour) {
                out.push(s.colour);
            }
        }
        out
    }
}

/// Predictions over `condition` with every other predictor at its typical
/// value: the mean, or the mode for 0/1 indicators.
pub fn plot_predictions(model: &LinearModel, condition: &Condition) -> Result<PlotData, ReportError> {
    let vars = &condition.variables;
    if vars.is_empty() || vars.len() > 3 {
        return Err(ReportError::UnsupportedPlot(format!(
            "condition needs 1 to 3 variables, got {}",
            vars.len()
        )));
    }
    let predictors = model.variables();
    for (name, _) in vars {
        if !predictors.contains(name) {
            return Err(ReportError::UnsupportedPlot(format!(
                "'{name}' is not a predictor in the model"
            )));
        }
    }

    let data = model.data();
    let (x_name, x_values) = &vars[0];
    let x_values = match x_values {
        Some(values) => values.clone(),
        None => {
            let (lo, hi) = (data.min(x_name)?, data.max(x_name)?);
            if !(hi > lo) {
                return Err(ReportError::UnsupportedPlot(format!(
                    "x variable '{x_name}' is constant"
                )));
            }
            GridValue::Range {
                from: lo,
                to: hi,
                n: X_POINTS,
            }
        }
    };

    let mut resolved = Vec::with_capacity(vars.len());
    for (name, values) in &vars[1..] {
        let values = match values {
            Some(values) => values.clone(),
            None if data.unique_sorted(name)?.len() <= MAX_DISCRETE => {
                GridValue::Summary(Summary::Unique)
            }
            None => GridValue::Summary(Summary::ThreeNum),
        };
        resolved.push((name.clone(), values));
    }

    // facet slowest, x fastest
    let mut builder = datagrid(model);
    for (name, values) in resolved.iter().rev() {
        builder = builder.set(name.clone(), values.clone());
    }
    let grid = builder.set(x_name.clone(), x_values).build()?;

    let options = PredictionOptions::builder().newdata(grid.clone()).build()?;
    let table = predictions(model, &options)?;

    let colour = resolved.first().map(|(n, _)| n.clone());
    let facet = resolved.get(1).map(|(n, _)| n.clone());
    let value_of = |name: &Option<String>, row: usize| -> Result<Option<f64>, ReportError> {
        Ok(match name {
            Some(n) => Some(grid.value(n, row)?),
            None => None,
        })
    };

    let mut series: Vec<Series> = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        let key_facet = value_of(&facet, i)?;
        let key_colour = value_of(&colour, i)?;
        let point = PlotPoint {
            x: grid.value(x_name, i)?,
            estimate: row.estimate,
            conf_low: row.conf_low,
            conf_high: row.conf_high,
        };
        match series
            .iter_mut()
            .find(|s| s.facet == key_facet && s.colour == key_colour)
        {
            Some(s) => s.points.push(point),
            None => series.push(Series {
                facet: key_facet,
                colour: key_colour,
                points: vec![point],
            }),
        }
    }

    debug!(
        x = %x_name,
        n_series = series.len(),
        n_points = table.len(),
        "prepared prediction plot"
    );

    Ok(PlotData {
        table,
        response: model.response().to_string(),
        x: x_name.clone(),
        colour,
        facet,
        series,
    })
}

/// Draw `plot` as a standalone SVG document: one panel per facet, a line
/// and a shaded confidence band per colour value.
pub fn render_svg(plot: &PlotData, width: f64, height: f64) -> String {
    let facets = plot.facets();
    let colours = plot.colours();

    let points = plot.series.iter().flat_map(|s| s.points.iter());
    let (x_min, x_max) = bounds(points.clone().map(|p| p.x));
    let (y_lo, y_hi) = bounds(points.flat_map(|p| [p.conf_low, p.conf_high]));
    let y_pad = 0.05 * (y_hi - y_lo).max(f64::EPSILON);
    let (y_min, y_max) = (y_lo - y_pad, y_hi + y_pad);

    let (left, right, top, bottom) = (50.0, 110.0, 30.0, 45.0);
    let gap = 15.0;
    let n_panels = facets.len().max(1) as f64;
    let panel_w = (width - left - right - gap * (n_panels - 1.0)) / n_panels;
    let panel_h = height - top - bottom;

    let mut out = String::new();
    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\" font-family=\"sans-serif\" font-size=\"11\">"
    );
    out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>");

    for (p, facet) in facets.iter().enumerate() {
        let x0 = left + p as f64 * (panel_w + gap);
        let sx = |x: f64| x0 + (x - x_min) / (x_max - x_min).max(f64::EPSILON) * panel_w;
        let sy = |y: f64| top + (y_max - y) / (y_max - y_min) * panel_h;

        let _ = write!(
            out,
            "<rect x=\"{x0:.1}\" y=\"{top:.1}\" width=\"{panel_w:.1}\" height=\"{panel_h:.1}\" \
             fill=\"#f4f4f4\" stroke=\"#999\"/>"
        );
        if let (Some(name), Some(value)) = (&plot.facet, facet) {
            let label = format!("{name} = {}", format_number(*value, 3));
            let _ = write!(
                out,
                "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">",
                x0 + panel_w / 2.0,
                top - 8.0
            );
            svg_escape_into(&mut out, &label);
            out.push_str("</text>");
        }

        for t in ticks(x_min, x_max) {
            let _ = write!(
                out,
                "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>",
                sx(t),
                top + panel_h + 14.0,
                format_number(t, 3)
            );
        }
        if p == 0 {
            for t in ticks(y_min, y_max) {
                let _ = write!(
                    out,
                    "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>",
                    x0 - 4.0,
                    sy(t) + 4.0,
                    format_number(t, 3)
                );
            }
        }

        for series in plot.series.iter().filter(|s| s.facet == *facet) {
            let c = colours.iter().position(|v| *v == series.colour).unwrap_or(0);
            let colour = PALETTE[c % PALETTE.len()];

            let mut band = String::new();
            for pt in &series.points {
                let _ = write!(band, "{:.2},{:.2} ", sx(pt.x), sy(pt.conf_high));
            }
            for pt in series.points.iter().rev() {
                let _ = write!(band, "{:.2},{:.2} ", sx(pt.x), sy(pt.conf_low));
            }
            let _ = write!(
                out,
                "<polygon points=\"{}\" fill=\"{colour}\" fill-opacity=\"0.2\" stroke=\"none\"/>",
                band.trim_end()
            );

            let line: Vec<String> = series
                .points
                .iter()
                .map(|pt| format!("{:.2},{:.2}", sx(pt.x), sy(pt.estimate)))
                .collect();
            let _ = write!(
                out,
                "<polyline points=\"{}\" fill=\"none\" stroke=\"{colour}\" stroke-width=\"1.5\"/>",
                line.join(" ")
            );
        }
    }

    // axis titles
    let _ = write!(
        out,
        "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">",
        left + (width - left - right) / 2.0,
        height - 8.0
    );
    svg_escape_into(&mut out, &plot.x);
    out.push_str("</text>");
    let _ = write!(
        out,
        "<text x=\"12\" y=\"{:.1}\" text-anchor=\"middle\" transform=\"rotate(-90 12 {:.1})\">",
        top + panel_h / 2.0,
        top + panel_h / 2.0
    );
    svg_escape_into(&mut out, &plot.response);
    out.push_str("</text>");

    if let Some(name) = &plot.colour {
        let lx = width - right + 15.0;
        let _ = write!(out, "<text x=\"{lx:.1}\" y=\"{:.1}\">", top + 10.0);
        svg_escape_into(&mut out, name);
        out.push_str("</text>");
        for (k, value) in colours.iter().enumerate() {
            let y = top + 28.0 + 16.0 * k as f64;
            let colour = PALETTE[k % PALETTE.len()];
            let _ = write!(
                out,
                "<rect x=\"{lx:.1}\" y=\"{:.1}\" width=\"12\" height=\"3\" fill=\"{colour}\"/>\
                 <text x=\"{:.1}\" y=\"{:.1}\">{}</text>",
                y - 4.0,
                lx + 18.0,
                y,
                value.map_or_else(String::new, |v| format_number(v, 3))
            );
        }
    }

    out.push_str("</svg>");
    out
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

/// Five evenly spaced tick positions.
fn ticks(lo: f64, hi: f64) -> Vec<f64> {
    (0..5).map(|i| lo + (hi - lo) * i as f64 / 4.0).collect()
}

fn svg_escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;

    fn model() -> LinearModel {
        LinearModel::fit("mpg ~ hp * wt * am", &mtcars()).unwrap()
    }

    #[test]
    fn test_three_variable_layout() {
        let m = model();
        let cond = Condition::new("hp")
            .by_values("wt", GridValue::Summary(Summary::ThreeNum))
            .by("am");
        let plot = plot_predictions(&m, &cond).unwrap();

        assert_eq!(plot.table.len(), 50 * 3 * 2);
        assert_eq!(plot.series.len(), 6);
        assert_eq!(plot.facets(), vec![Some(0.0), Some(1.0)]);
        assert!(plot.series.iter().all(|s| s.points.len() == 50));

        let xs: Vec<f64> = plot.series[0].points.iter().map(|p| p.x).collect();
        assert_eq!(xs[0], 52.0);
        assert!((xs[49] - 335.0).abs() < 1e-9);
    }

    #[test]
    fn test_unset_indicator_held_at_mode() {
        let m = model();
        let plot = plot_predictions(&m, &Condition::new("hp")).unwrap();
        let b = m.coefficients();
        let wt = m.data().mean("wt").unwrap();

        // am = 0 drops every am term
        for p in &plot.series[0].points {
            let want = b[0] + b[1] * p.x + b[2] * wt + b[4] * p.x * wt;
            assert!((p.estimate - want).abs() < 1e-8);
        }
    }

    #[test]
    fn test_too_many_variables() {
        let m = model();
        let cond = Condition::new("hp").by("wt").by("am").by("wt");
        assert!(matches!(
            plot_predictions(&m, &cond),
            Err(ReportError::UnsupportedPlot(_))
        ));
    }

    #[test]
    fn test_unknown_variable() {
        let m = model();
        assert!(matches!(
            plot_predictions(&m, &Condition::new("qsec")),
            Err(ReportError::UnsupportedPlot(_))
        ));
    }

    #[test]
    fn test_svg_has_one_band_and_line_per_series() {
        let m = model();
        let cond = Condition::new("hp").by("am");
        let plot = plot_predictions(&m, &cond).unwrap();
        let svg = render_svg(&plot, 600.0, 300.0);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert_eq!(svg.matches("<polyline").count(), 2);
    }
}
