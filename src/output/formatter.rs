//! Core formatting traits and the plain text implementation

use crate::{
    error::{AppError, Result},
    models::{AnalysisReport, DeviceComparison, TestRunResult},
    types::StatisticalMetric,
    utils::sorted_values,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format one finished run: metadata, metrics and optionally a histogram
    fn format_run_summary(&self, run: &TestRunResult, show_histogram: bool) -> Result<String>;

    /// Format the per-device score table
    fn format_comparison(&self, comparison: &DeviceComparison) -> Result<String>;

    /// Format the closing recommendation
    fn format_recommendation(&self, comparison: &DeviceComparison) -> Result<String>;

    /// Text histogram of a run's readings
    fn format_histogram(&self, values: &[f64]) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show skewness, kurtosis and the normality p-value
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Number of histogram bins
    pub histogram_bins: usize,
    /// Width of the longest histogram bar
    pub histogram_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            histogram_bins: 10,
            histogram_width: 40,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize) -> Self {
        Self { header: header.to_string(), alignment, min_width }
    }
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// One histogram bin: `[lower, upper)`, the last bin closed
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins over `[min, max]`. A constant sample lands in one bin.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let sorted = sorted_values(values);
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    if min == max {
        return vec![HistogramBin { lower: min, upper: max, count: values.len() }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for value in values {
        let index = (((value - min) / width) as usize).min(bins - 1);
        result[index].count += 1;
    }

    result
}

pub(crate) fn fmt_err(section: &str) -> impl Fn(std::fmt::Error) -> AppError + '_ {
    move |e| AppError::internal(format!("Failed to format {}: {}", section, e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Create a table with the given columns and rows
    pub(crate) fn create_table(&self, columns: &[Column], rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                rows.iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(column.min_width)
                    .max(column.header.chars().count())
            })
            .collect();

        let borders = self.options.table_borders;
        let mut output = String::new();

        if borders {
            output.push_str(&horizontal_border(&widths));
            output.push('\n');
        }
        let headers: RowData = columns.iter().map(|c| c.header.clone()).collect();
        output.push_str(&create_row(&headers, &widths, columns, borders));
        output.push('\n');
        if borders {
            output.push_str(&horizontal_border(&widths));
            output.push('\n');
        }

        for row in rows {
            output.push_str(&create_row(row, &widths, columns, borders));
            output.push('\n');
        }

        if borders {
            output.push_str(&horizontal_border(&widths));
        }

        output
    }

    /// Metric lines in a fixed order, only for metrics the report carries
    pub(crate) fn metric_lines(&self, report: &AnalysisReport) -> Vec<(String, String)> {
        let mut lines: Vec<(String, String)> = report
            .enabled_metrics()
            .into_iter()
            .map(|(metric, value)| (metric_label(metric).to_string(), format_amps(value)))
            .collect();

        let (low, high) = report.confidence_interval_95;
        lines.push(("95% CI".to_string(), format!("[{}, {}]", format_amps(low), format_amps(high))));
        lines.push(("Outliers".to_string(), report.outliers_count.to_string()));

        if self.options.verbose_mode {
            lines.push(("Skewness".to_string(), format!("{:.4}", report.skewness)));
            lines.push(("Kurtosis".to_string(), format!("{:.4}", report.kurtosis)));
            lines.push((
                "Normality p".to_string(),
                report.normality_p_value.map(|p| format!("{:.4}", p)).unwrap_or_else(|| "N/A".to_string()),
            ));
        }

        lines
    }

    pub(crate) fn histogram_lines(&self, values: &[f64]) -> Vec<(String, String, usize)> {
        let bins = histogram_bins(values, self.options.histogram_bins);
        let peak = bins.iter().map(|b| b.count).max().unwrap_or(0);

        bins.into_iter()
            .map(|bin| {
                let bar_len = if peak == 0 { 0 } else { bin.count * self.options.histogram_width / peak };
                let label = format!("{:>10.4} .. {:<10.4}", bin.lower, bin.upper);
                (label, "#".repeat(bar_len), bin.count)
            })
            .collect()
    }
}

fn create_row(data: &[String], widths: &[usize], columns: &[Column], borders: bool) -> String {
    let mut row = String::new();
    if borders {
        row.push('|');
    }

    for ((cell, &width), column) in data.iter().zip(widths).zip(columns) {
        let padded = align_text(cell, width, column.alignment);
        if borders {
            row.push(' ');
            row.push_str(&padded);
            row.push_str(" |");
        } else {
            row.push_str(&padded);
            row.push_str("  ");
        }
    }

    row.trim_end().to_string()
}

fn horizontal_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let padding = " ".repeat(width - len);
    match alignment {
        Alignment::Left => format!("{}{}", text, padding),
        Alignment::Right => format!("{}{}", padding, text),
    }
}

pub(crate) fn metric_label(metric: StatisticalMetric) -> &'static str {
    match metric {
        StatisticalMetric::Mean => "Mean",
        StatisticalMetric::Median => "Median",
        StatisticalMetric::StdDev => "Std Dev",
        StatisticalMetric::Min => "Min",
        StatisticalMetric::Max => "Max",
    }
}

/// Reading in amperes
pub(crate) fn format_amps(value: f64) -> String {
    format!("{:.4} A", value)
}

pub(crate) fn comparison_columns() -> Vec<Column> {
    vec![
        Column::new("Rank", Alignment::Right, 4),
        Column::new("Device", Alignment::Left, 10),
        Column::new("Precision", Alignment::Right, 10),
        Column::new("Outliers", Alignment::Right, 8),
        Column::new("Score", Alignment::Right, 8),
    ]
}

/// Comparison rows, best score first; ties keep batch order
pub(crate) fn comparison_rows(comparison: &DeviceComparison) -> Vec<RowData> {
    let mut ordered: Vec<_> = comparison.per_device.iter().collect();
    ordered.sort_by(|a, b| crate::utils::safe_float_cmp(a.total_score, b.total_score));

    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, score)| {
            vec![
                (idx + 1).to_string(),
                score.device_type.clone(),
                format!("{:.4}", score.precision),
                score.outliers.to_string(),
                format!("{:.4}", score.total_score),
            ]
        })
        .collect()
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.chars().count() + 4);
        writeln!(output, "{}", border).map_err(fmt_err("header"))?;
        writeln!(output, "  {}  ", title).map_err(fmt_err("header"))?;
        write!(output, "{}", border).map_err(fmt_err("header"))?;
        Ok(output)
    }

    fn format_run_summary(&self, run: &TestRunResult, show_histogram: bool) -> Result<String> {
        let mut output = String::new();
        let err = fmt_err("run summary");

        writeln!(output, "Device:       {}", run.device_type()).map_err(&err)?;
        writeln!(output, "Run ID:       {}", run.run_id()).map_err(&err)?;
        writeln!(output, "Frequency:    {} Hz", run.metadata.sampling_frequency_hz).map_err(&err)?;
        writeln!(
            output,
            "Samples:      {} acquired, {} failed",
            run.acquired_count(),
            run.failed_count()
        ).map_err(&err)?;

        match &run.analysis {
            Some(report) => {
                writeln!(output, "\nStatistics:").map_err(&err)?;
                for (label, value) in self.metric_lines(report) {
                    writeln!(output, "  {:<12} {}", label, value).map_err(&err)?;
                }
            }
            None => {
                writeln!(output, "\nNo analysis available for this run.").map_err(&err)?;
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
            return Ok("No devices compared.".to_string());
        }

        let mut output = String::new();
        writeln!(output, "Device Comparison (outlier penalty {}):", comparison.outlier_penalty)
            .map_err(fmt_err("comparison"))?;
        output.push_str(&self.create_table(&comparison_columns(), &comparison_rows(comparison)));
        Ok(output)
    }

    fn format_recommendation(&self, comparison: &DeviceComparison) -> Result<String> {
        match comparison.best() {
            Some(best) => Ok(format!(
                "Recommendation: use '{}' (score {:.4}, precision {:.4}, {} outliers)",
                best.device_type, best.total_score, best.precision, best.outliers
            )),
            None => Ok("Recommendation: no device could be ranked".to_string()),
        }
    }

    fn format_histogram(&self, values: &[f64]) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "Distribution:").map_err(fmt_err("histogram"))?;
        for (label, bar, count) in self.histogram_lines(values) {
            writeln!(output, "  {} | {} {}", label, bar, count).map_err(fmt_err("histogram"))?;
        }
        Ok(output.trim_end().to_string())
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
