//! Colored formatter implementation with terminal color support

use super::formatter::{
    comparison_columns, comparison_rows, fmt_err, FormattingOptions, OutputFormatter, PlainFormatter,
};
use crate::{
    error::Result,
    models::{DeviceComparison, TestRunResult},
};
use colored::*;
use std::fmt::Write as _;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            highlight: Color::Magenta,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter; layout comes from [`PlainFormatter`]
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            plain_formatter: PlainFormatter::new(options.clone()),
            options,
            color_scheme,
        }
    }

    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn dimmed(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.dimmed()
        } else {
            text.normal()
        }
    }

    fn section_header(&self, title: &str) -> String {
        self.bold(title).color(self.color_scheme.header).to_string()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err("header"))?;
        writeln!(output, "  {}  ", self.bold(title).color(self.color_scheme.header)).map_err(fmt_err("header"))?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err("header"))?;

        Ok(output)
    }

    fn format_run_summary(&self, run: &TestRunResult, show_histogram: bool) -> Result<String> {
        let mut output = String::new();
        let err = fmt_err("run summary");

        writeln!(output, "{} {}", self.section_header("Device:"), self.bold(run.device_type()).color(self.color_scheme.info))
            .map_err(&err)?;
        writeln!(output, "  {} {}", self.dimmed("run"), self.dimmed(run.run_id())).map_err(&err)?;
        writeln!(output, "  Frequency:    {} Hz", run.metadata.sampling_frequency_hz).map_err(&err)?;

        let failed = run.failed_count();
        let failed_text = failed.to_string();
        let failed_display = if failed == 0 {
            self.colorize(&failed_text, self.color_scheme.success)
        } else {
            self.colorize(&failed_text, self.color_scheme.error)
        };
        writeln!(
            output,
            "  Samples:      {} acquired, {} failed",
            self.colorize(&run.acquired_count().to_string(), self.color_scheme.success),
            failed_display
        ).map_err(&err)?;

        match &run.analysis {
            Some(report) => {
                writeln!(output, "\n{}", self.section_header("Statistics")).map_err(&err)?;
                for (label, value) in self.plain_formatter.metric_lines(report) {
                    writeln!(output, "  {:<12} {}", label, self.colorize(&value, self.color_scheme.highlight))
                        .map_err(&err)?;
                }
                if report.excluded_samples > 0 {
                    writeln!(
                        output,
                        "  {}",
                        self.colorize(
                            &format!("{} failed samples excluded from analysis", report.excluded_samples),
                            self.color_scheme.warning
                        )
                    ).map_err(&err)?;
                }
            }
            None => {
                writeln!(output, "\n{}", self.colorize("No analysis available for this run.", self.color_scheme.warning))
                    .map_err(&err)?;
            }
        }

        if show_histogram {
            let values: Vec<f64> = run.measurements.iter().filter(|m| m.is_acquired()).map(|m| m.value).collect();
            if !values.is_empty() {
                writeln!(output, "\n{}", self.format_histogram(&values)?).map_err(&err)?;
            }
        }

        Ok(output.trim_end().to_string())
    }

    fn format_comparison(&self, comparison: &DeviceComparison) -> Result<String> {
        if comparison.per_device.is_empty() {
            return Ok(self.colorize("No devices compared.", self.color_scheme.muted).to_string());
        }

        let mut output = String::new();
        writeln!(
            output,
            "{} {}",
            self.section_header("Device Comparison"),
            self.dimmed(&format!("(outlier penalty {})", comparison.outlier_penalty))
        ).map_err(fmt_err("comparison"))?;

        let table = self.plain_formatter.create_table(&comparison_columns(), &comparison_rows(comparison));
        for line in table.lines() {
            let colored_line = if line.starts_with('+') {
                self.colorize(line, self.color_scheme.border).to_string()
            } else if line.contains(&format!(" {} ", comparison.best_device)) {
                self.colorize(line, self.color_scheme.success).to_string()
            } else {
                line.to_string()
            };
            writeln!(output, "{}", colored_line).map_err(fmt_err("comparison"))?;
        }

        Ok(output.trim_end().to_string())
    }

    fn format_recommendation(&self, comparison: &DeviceComparison) -> Result<String> {
        match comparison.best() {
            Some(best) => Ok(format!(
                "{} use '{}' (score {:.4}, precision {:.4}, {} outliers)",
                self.section_header("Recommendation:"),
                self.bold(&best.device_type).color(self.color_scheme.success),
                best.total_score,
                best.precision,
                best.outliers
            )),
            None => Ok(self.colorize("Recommendation: no device could be ranked", self.color_scheme.warning).to_string()),
        }
    }

    fn format_histogram(&self, values: &[f64]) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.section_header("Distribution")).map_err(fmt_err("histogram"))?;
        for (label, bar, count) in self.plain_formatter.histogram_lines(values) {
            writeln!(
                output,
                "  {} {} {} {}",
                self.dimmed(&label),
                self.colorize("│", self.color_scheme.border),
                self.colorize(&bar, self.color_scheme.info),
                count
            ).map_err(fmt_err("histogram"))?;
        }
        Ok(output.trim_end().to_string())
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.bold("ERROR:").color(self.color_scheme.error), error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.bold("WARNING:").color(self.color_scheme.warning), warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("{} {}", self.bold("SUCCESS:").color(self.color_scheme.success), message))
    }
}
