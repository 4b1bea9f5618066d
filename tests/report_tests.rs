//! Rendering: tables, the prediction chart and whole documents.

mod common;

use common::{additive_model, interaction_model};
use margins_rs::effects::{avg_slopes, predictions, PredictionOptions, SlopeOptions};
use margins_rs::grid::{GridValue, Summary};
use margins_rs::report::{
    format_table, plot_predictions, render_svg, Condition, Document, FloatPlacement,
    OutputFormat, ReportError, ReportOptions, SessionInfo, TableStyle,
};

#[test]
fn test_coefficient_table_styles() {
    let table = additive_model().coefficient_table();

    let pipe = format_table(&table, TableStyle::Pipe).unwrap();
    assert!(pipe.lines().nth(1).unwrap().starts_with("|"));
    assert!(pipe.contains("(Intercept)"));
    assert!(pipe.contains("37.2"));

    let grid = format_table(&table, TableStyle::Grid).unwrap();
    assert!(grid.starts_with('+'));

    let compact = format_table(&table, TableStyle::Compact).unwrap();
    assert_eq!(compact.lines().count(), 4);
}

#[test]
fn test_equivalence_columns_are_printed() {
    let model = additive_model();
    let equiv = avg_slopes(
        &model,
        &SlopeOptions::builder().equivalence(-2.0, 2.0).build().unwrap(),
    )
    .unwrap();
    let plain = avg_slopes(&model, &SlopeOptions::default()).unwrap();

    let with = format_table(&equiv, TableStyle::Compact).unwrap();
    let without = format_table(&plain, TableStyle::Compact).unwrap();
    let header_width = |s: &str| s.lines().next().unwrap().split_whitespace().count();
    assert!(header_width(&with) > header_width(&without));
}

#[test]
fn test_long_tables_are_truncated() {
    let model = interaction_model();
    let pre = predictions(&model, &PredictionOptions::default()).unwrap();
    let text = format_table(&pre, TableStyle::Compact).unwrap();
    assert!(text.contains("--- 22 rows omitted ---"));
}

#[test]
fn test_table_json() {
    let table = additive_model().coefficient_table();
    let json = table.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 3);
    assert_eq!(value[1]["term"], "hp");
}

#[test]
fn test_plot_and_svg() {
    let model = interaction_model();
    let condition = Condition::new("hp")
        .by_values("wt", GridValue::Summary(Summary::ThreeNum))
        .by("am");
    let plot = plot_predictions(&model, &condition).unwrap();
    assert_eq!(plot.facet.as_deref(), Some("am"));
    assert_eq!(plot.colour.as_deref(), Some("wt"));

    let svg = render_svg(&plot, 720.0, 300.0);
    assert_eq!(svg.matches("<polyline").count(), 6);
    assert!(svg.contains("am = 0"));
    assert!(svg.contains("am = 1"));
}

#[test]
fn test_plot_rejects_constant_x() {
    let data = margins_rs::mtcars().with_constant("vs", 1.0).unwrap();
    let model = margins_rs::LinearModel::fit("mpg ~ vs + wt - 1", &data).unwrap();
    assert!(matches!(
        plot_predictions(&model, &Condition::new("vs")),
        Err(ReportError::UnsupportedPlot(_))
    ));
    assert!(matches!(
        plot_predictions(&model, &Condition::new("qsec")),
        Err(ReportError::UnsupportedPlot(_))
    ));
}

#[test]
fn test_document_written_to_disk() {
    let mut doc = Document::new("Report");
    doc.prose("Coefficients:");
    doc.code(
        "model.coefficient_table()",
        Some(format_table(&additive_model().coefficient_table(), TableStyle::Pipe).unwrap()),
    );
    doc.figure("chart.svg", "A chart");
    doc.code("SessionInfo::collect()", Some(SessionInfo::collect().to_string()));

    let options = ReportOptions::builder()
        .format(OutputFormat::Latex)
        .float_placement(FloatPlacement::Auto)
        .build()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.tex");
    std::fs::write(&path, doc.render(&options)).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();

    assert!(text.contains("\\begin{figure}[htbp]"));
    assert!(text.contains("margins-rs"));
    assert!(text.contains("\\begin{verbatim}"));
}
