//! Renders the marginal effects tutorial.
//!
//! Runs every cell in order against the built-in `mtcars` data and writes a
//! single Markdown or LaTeX document plus the prediction chart as SVG. Any
//! error or failed check stops the run before anything is written.

use clap::Parser;
use margins_rs::prelude::*;
use margins_rs::report::format_table_with;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Render the marginal effects tutorial
#[derive(Parser, Debug)]
#[command(name = "margins-tutorial")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Table layout: pipe, grid or compact
    #[arg(long, default_value = "pipe")]
    table_style: TableStyle,

    /// LaTeX figure placement: here, top or auto
    #[arg(long, default_value = "here")]
    float_placement: FloatPlacement,

    /// Output format: markdown or latex
    #[arg(long, default_value = "markdown")]
    format: OutputFormat,

    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

/// A rendered report waiting to be written.
struct Rendered {
    document: String,
    svg: String,
    svg_path: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "tutorial failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ReportError> {
    let options = ReportOptions::builder()
        .table_style(cli.table_style)
        .float_placement(cli.float_placement)
        .format(cli.format)
        .build()?;

    let svg_path = match &cli.output {
        Some(path) => sibling(path, "predictions.svg"),
        None => PathBuf::from("predictions.svg"),
    };
    let rendered = render(&options, &svg_path)?;

    std::fs::write(&rendered.svg_path, &rendered.svg)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &rendered.document)?;
            info!(path = %path.display(), "wrote report");
        }
        None => print!("{}", rendered.document),
    }
    info!(path = %rendered.svg_path.display(), "wrote chart");
    Ok(())
}

/// `<stem>-<suffix>` in the directory of `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!("{stem}-{suffix}"))
}

fn ensure(condition: bool, message: impl Into<String>) -> Result<(), ReportError> {
    if condition {
        Ok(())
    } else {
        Err(ReportError::InvariantViolation(message.into()))
    }
}

fn render(options: &ReportOptions, svg_path: &Path) -> Result<Rendered, ReportError> {
    let table = |t: &EffectsTable| format_table_with(t, options.table_style, options.digits);
    let mut doc = Document::new("Predictions, comparisons and slopes");

    doc.prose(
        "A regression coefficient answers one narrow question. Once a model has \
         interactions, the quantities a reader cares about, such as the predicted outcome \
         for a given car or its change when one predictor moves, depend on several \
         coefficients at once. This chapter computes them directly, with delta-method \
         standard errors.",
    );

    // data
    doc.heading(1, "Data and model");
    let data = mtcars();
    info!(rows = data.n_rows(), cols = data.n_cols(), "loaded mtcars");
    doc.prose(
        "The Motor Trend cars data has 32 cars. We model fuel efficiency (`mpg`) as a \
         function of horsepower, weight and transmission (`am`, 1 for manual), with \
         every interaction among the three.",
    );
    let model = LinearModel::fit("mpg ~ hp * wt * am", &data)?;
    doc.code(
        "let data = mtcars();\nlet model = LinearModel::fit(\"mpg ~ hp * wt * am\", &data)?;\n\
         model.coefficient_table()",
        Some(table(&model.coefficient_table())?),
    );

    // predictions
    doc.heading(1, "Predictions");
    doc.prose("By default, one prediction is made for every row of the data used to fit the model.");
    let pre = predictions(&model, &PredictionOptions::default())?;
    ensure(pre.len() == 32, format!("predictions: expected 32 rows, got {}", pre.len()))?;
    doc.code(
        "let pre = predictions(&model, &PredictionOptions::default())?;\nassert_eq!(pre.len(), 32);",
        Some(table(&pre)?),
    );

    doc.prose(
        "Comparisons move one predictor while holding the others fixed; slopes take the \
         partial derivative. Both produce one row per observation and per predictor.",
    );
    let cmp = comparisons(&model, &ComparisonOptions::default())?;
    ensure(cmp.len() == 96, format!("comparisons: expected 96 rows, got {}", cmp.len()))?;
    let mfx = slopes(&model, &SlopeOptions::default())?;
    ensure(mfx.len() == 96, format!("slopes: expected 96 rows, got {}", mfx.len()))?;
    doc.code(
        "let cmp = comparisons(&model, &ComparisonOptions::default())?;\n\
         let mfx = slopes(&model, &SlopeOptions::default())?;\n\
         assert_eq!(cmp.len(), 96);\nassert_eq!(mfx.len(), 96);",
        Some(table(&mfx)?),
    );

    // grid
    doc.heading(2, "Grids");
    doc.prose(
        "`datagrid` builds synthetic rows: the columns we set take every combination of \
         the values given, and all other columns sit at their means (or their most \
         common value for 0/1 indicators such as `am`).",
    );
    let grid = datagrid(&model)
        .set("hp", GridValue::Values(vec![100.0, 120.0]))
        .set("am", GridValue::Values(vec![0.0, 1.0]))
        .build()?;
    let on_grid = predictions(&model, &PredictionOptions::builder().newdata(grid).build()?)?;
    ensure(on_grid.len() == 4, format!("grid predictions: expected 4 rows, got {}", on_grid.len()))?;
    doc.code(
        "let grid = datagrid(&model)\n    .set(\"hp\", GridValue::Values(vec![100.0, 120.0]))\n    \
         .set(\"am\", GridValue::Values(vec![0.0, 1.0]))\n    .build()?;\n\
         predictions(&model, &PredictionOptions::builder().newdata(grid).build()?)?",
        Some(table(&on_grid)?),
    );

    // averages
    doc.heading(1, "Averages and groups");
    let avg = avg_predictions(&model, &PredictionOptions::default())?;
    let unit_mean = pre.estimates().iter().sum::<f64>() / pre.len() as f64;
    ensure(
        avg.len() == 1 && (avg.rows()[0].estimate - unit_mean).abs() < 1e-9,
        "average prediction differs from the mean of unit-level predictions",
    )?;
    doc.prose(
        "Averaging the 32 unit-level predictions gives one number, which is exactly the \
         average prediction:",
    );
    doc.code(
        "let avg = avg_predictions(&model, &PredictionOptions::default())?;\n\
         let mean = pre.estimates().iter().sum::<f64>() / pre.len() as f64;\n\
         assert!((avg.rows()[0].estimate - mean).abs() < 1e-9);",
        Some(table(&avg)?),
    );

    let by_am = avg_predictions(
        &model,
        &PredictionOptions::builder().by(By::columns(["am"])).build()?,
    )?;
    ensure(by_am.len() == 2, format!("predictions by am: expected 2 rows, got {}", by_am.len()))?;
    let cmp_by_am = avg_comparisons(
        &model,
        &ComparisonOptions::builder().by(By::columns(["am"])).build()?,
    )?;
    doc.prose("The `by` argument averages within groups instead:");
    doc.code(
        "let by = By::columns([\"am\"]);\n\
         avg_predictions(&model, &PredictionOptions::builder().by(by.clone()).build()?)?;\n\
         avg_comparisons(&model, &ComparisonOptions::builder().by(by).build()?)?",
        Some(format!("{}\n{}", table(&by_am)?, table(&cmp_by_am)?)),
    );

    // contrasts
    doc.heading(2, "Choosing the contrast");
    doc.prose(
        "The default comparison adds one unit. A contrast can instead name both values \
         explicitly or use a spread of the training data; the table keeps the same shape.",
    );
    let pair = avg_comparisons(
        &model,
        &ComparisonOptions::builder()
            .variable("hp", Contrast::Pair { lo: 100.0, hi: 120.0 })
            .build()?,
    )?;
    let sd = avg_comparisons(
        &model,
        &ComparisonOptions::builder().variable("hp", Contrast::Sd).build()?,
    )?;
    ensure(
        pair.len() == sd.len() && pair.column_names() == sd.column_names(),
        "pair and sd comparisons have different shapes",
    )?;
    doc.code(
        "avg_comparisons(&model, &ComparisonOptions::builder()\n    \
         .variable(\"hp\", Contrast::Pair { lo: 100.0, hi: 120.0 }).build()?)?;\n\
         avg_comparisons(&model, &ComparisonOptions::builder()\n    \
         .variable(\"hp\", Contrast::Sd).build()?)?",
        Some(format!("{}\n{}", table(&pair)?, table(&sd)?)),
    );

    doc.prose(
        "Ratios are often easier to read on the log scale. Comparing the log of the ratio \
         of average predictions and exponentiating afterwards gives a ratio with an \
         asymmetric interval:",
    );
    let ratio = avg_comparisons(
        &model,
        &ComparisonOptions::builder()
            .variable("hp", Contrast::Delta(10.0))
            .comparison(ComparisonFn::LnRatioAvg)
            .transform(Transform::Exp)
            .build()?,
    )?;
    doc.code(
        "avg_comparisons(&model, &ComparisonOptions::builder()\n    \
         .variable(\"hp\", Contrast::Delta(10.0))\n    \
         .comparison(ComparisonFn::LnRatioAvg)\n    .transform(Transform::Exp)\n    .build()?)?",
        Some(table(&ratio)?),
    );

    // plot
    doc.heading(1, "Plotting");
    doc.prose(
        "Conditional predictions sweep one predictor across its range, with weight at \
         three representative values and one panel per transmission type.",
    );
    let condition = Condition::new("hp")
        .by_values("wt", GridValue::Summary(Summary::ThreeNum))
        .by("am");
    let plot = plot_predictions(&model, &condition)?;
    let svg = render_svg(&plot, options.figure_width, options.figure_height);
    doc.code(
        "let condition = Condition::new(\"hp\")\n    \
         .by_values(\"wt\", GridValue::Summary(Summary::ThreeNum))\n    .by(\"am\");\n\
         render_svg(&plot_predictions(&model, &condition)?, 720.0, 300.0)",
        None,
    );
    let svg_name = svg_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "predictions.svg".to_string());
    doc.figure(svg_name, "Predicted mpg by horsepower, weight and transmission");

    // hypotheses
    doc.heading(1, "Hypothesis tests");
    let additive = LinearModel::fit("mpg ~ hp + wt", &data)?;
    doc.prose("A simpler model makes the coefficients easier to talk about:");
    doc.code(
        "let additive = LinearModel::fit(\"mpg ~ hp + wt\", &data)?;",
        Some(table(&additive.coefficient_table())?),
    );
    doc.prose(
        "Is the weight coefficient twice the horsepower coefficient? Coefficients can be \
         referenced by position (`b1` is the intercept) or by name.",
    );
    let positional = additive.hypotheses("b3 = 2 * b2")?;
    let named = additive.hypotheses("wt = 2 * hp")?;
    ensure(
        positional.len() == 1
            && named.len() == 1
            && (positional.rows()[0].estimate - named.rows()[0].estimate).abs() < 1e-12
            && positional.rows()[0].p_value.is_finite(),
        "positional and named hypotheses disagree",
    )?;
    doc.code(
        "additive.hypotheses(\"b3 = 2 * b2\")?;\nadditive.hypotheses(\"wt = 2 * hp\")?",
        Some(format!("{}\n{}", table(&positional)?, table(&named)?)),
    );

    doc.prose(
        "An equivalence test asks the opposite question: is each average slope inside \
         (-2, 2), a range we consider practically zero?",
    );
    let plain = avg_slopes(&additive, &SlopeOptions::default())?;
    let equiv = avg_slopes(
        &additive,
        &SlopeOptions::builder().equivalence(-2.0, 2.0).build()?,
    )?;
    ensure(
        plain.estimates() == equiv.estimates() && plain.std_errors() == equiv.std_errors(),
        "equivalence test changed the estimates",
    )?;
    doc.code(
        "avg_slopes(&additive, &SlopeOptions::builder().equivalence(-2.0, 2.0).build()?)?",
        Some(table(&equiv)?),
    );

    // session
    doc.heading(1, "Session info");
    doc.code("SessionInfo::collect()", Some(SessionInfo::collect().to_string()));

    info!(cells = doc.cells().len(), "rendered document");
    Ok(Rendered {
        document: doc.render(options),
        svg,
        svg_path: svg_path.to_path_buf(),
    })
}
