//! Document assembly: an ordered list of cells rendered to Markdown or LaTeX.

use super::{FloatPlacement, OutputFormat, ReportOptions};
use std::fmt::Write;

/// One block of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Heading { level: usize, text: String },
    Prose(String),
    /// Source listing and, when it prints something, its output.
    Code { source: String, output: Option<String> },
    /// Image file reference with a caption.
    Figure { path: String, caption: String },
}

/// A titled sequence of cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    title: String,
    cells: Vec<Cell>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cells: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn heading(&mut self, level: usize, text: impl Into<String>) {
        self.push(Cell::Heading {
            level: level.clamp(1, 3),
            text: text.into(),
        });
    }

    pub fn prose(&mut self, text: impl Into<String>) {
        self.push(Cell::Prose(text.into()));
    }

    pub fn code(&mut self, source: impl Into<String>, output: Option<String>) {
        self.push(Cell::Code {
            source: source.into(),
            output,
        });
    }

    pub fn figure(&mut self, path: impl Into<String>, caption: impl Into<String>) {
        self.push(Cell::Figure {
            path: path.into(),
            caption: caption.into(),
        });
    }

    /// Render in the format selected by `options`.
    pub fn render(&self, options: &ReportOptions) -> String {
        match options.format {
            OutputFormat::Markdown => self.to_markdown(),
            OutputFormat::Latex => self.to_latex(options.float_placement),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.title);
        for cell in &self.cells {
            out.push('\n');
            match cell {
                Cell::Heading { level, text } => {
                    let _ = writeln!(out, "{} {text}", "#".repeat(level + 1));
                }
                Cell::Prose(text) => {
                    let _ = writeln!(out, "{}", text.trim_end());
                }
                Cell::Code { source, output } => {
                    let _ = writeln!(out, "```rust\n{}\n```", source.trim_end());
                    if let Some(output) = output {
                        let _ = writeln!(out, "\n```text\n{}\n```", output.trim_end());
                    }
                }
                Cell::Figure { path, caption } => {
                    let _ = writeln!(out, "![{caption}]({path})");
                }
            }
        }
        out
    }

    pub fn to_latex(&self, placement: FloatPlacement) -> String {
        let mut out = String::from(
            "\\documentclass{article}\n\
             \\usepackage{graphicx}\n\
             \\usepackage{float}\n\
             \\usepackage[margin=2.5cm]{geometry}\n",
        );
        let _ = writeln!(out, "\\title{{{}}}", latex_escape(&self.title));
        out.push_str("\\date{}\n\\begin{document}\n\\maketitle\n");

        for cell in &self.cells {
            out.push('\n');
            match cell {
                Cell::Heading { level, text } => {
                    let command = match level {
                        1 => "section",
                        2 => "subsection",
                        _ => "subsubsection",
                    };
                    let _ = writeln!(out, "\\{command}*{{{}}}", latex_escape(text));
                }
                Cell::Prose(text) => {
                    let _ = writeln!(out, "{}", latex_escape(text.trim_end()));
                }
                Cell::Code { source, output } => {
                    let _ = writeln!(out, "\\begin{{verbatim}}\n{}\n\\end{{verbatim}}", source.trim_end());
                    if let Some(output) = output {
                        let _ = writeln!(
                            out,
                            "{{\\small\n\\begin{{verbatim}}\n{}\n\\end{{verbatim}}\n}}",
                            output.trim_end()
                        );
                    }
                }
                Cell::Figure { path, caption } => {
                    let _ = writeln!(
                        out,
                        "\\begin{{figure}}{}\n\\centering\n\
                         \\includegraphics[width=\\linewidth]{{{path}}}\n\
                         \\caption{{{}}}\n\\end{{figure}}",
                        placement.specifier(),
                        latex_escape(caption)
                    );
                }
            }
        }
        out.push_str("\n\\end{document}\n");
        out
    }
}

fn latex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new("Tutorial");
        doc.heading(1, "Predictions");
        doc.prose("Fit mpg_hat & friends.");
        doc.code("let x = 1;", Some("1".into()));
        doc.figure("plot.svg", "Predicted mpg");
        doc
    }

    #[test]
    fn test_markdown() {
        let md = sample().to_markdown();
        assert!(md.starts_with("# Tutorial\n"));
        assert!(md.contains("## Predictions"));
        assert!(md.contains("```rust\nlet x = 1;\n```"));
        assert!(md.contains("```text\n1\n```"));
        assert!(md.contains("![Predicted mpg](plot.svg)"));
    }

    #[test]
    fn test_latex_uses_float_placement() {
        let doc = sample();
        let tex = doc.to_latex(FloatPlacement::Top);
        assert!(tex.contains("\\begin{figure}[t]"));
        assert!(tex.contains("\\includegraphics[width=\\linewidth]{plot.svg}"));
        assert!(tex.contains("mpg\\_hat \\& friends."));
        assert!(tex.trim_end().ends_with("\\end{document}"));

        let options = ReportOptions::builder()
            .format(OutputFormat::Latex)
            .build()
            .unwrap();
        assert!(doc.render(&options).contains("\\begin{figure}[H]"));
    }
}
