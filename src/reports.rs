use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::plots::{self, escape_text, Figure, PlotOptions};
use crate::stats::{
    cumulative_relative_returns, portfolio_returns, yearly_statistics, YearlyStatistics,
    DEFAULT_DAYS_PER_YEAR,
};
use crate::utils::{DataError, PriceFrame, PriceSeries, Weights};

const DEFAULT_TITLE: &str = "Portfolio Returns";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_TEMPLATE: &str = include_str!("report_template.html");

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Computes [`yearly_statistics`] and prints both lines to stdout.
pub fn print_yearly_statistics(
    cumulative_relative_returns: &[f64],
    days_per_year: u32,
) -> Result<YearlyStatistics, DataError> {
    let stats = yearly_statistics(cumulative_relative_returns, days_per_year)?;
    println!("{stats}");
    Ok(stats)
}

pub struct HtmlReportOptions {
    pub title: String,
    pub output: Option<PathBuf>,
    pub days_per_year: u32,
    pub rolling_windows: Vec<usize>,
    pub template_path: Option<PathBuf>,
}

impl Default for HtmlReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            output: None,
            days_per_year: DEFAULT_DAYS_PER_YEAR,
            rolling_windows: vec![20, 100],
            template_path: None,
        }
    }
}

impl HtmlReportOptions {
    pub fn with_output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_days_per_year(mut self, days_per_year: u32) -> Self {
        self.days_per_year = days_per_year;
        self
    }

    pub fn with_rolling_windows(mut self, windows: Vec<usize>) -> Self {
        self.rolling_windows = windows;
        self
    }

    pub fn with_template_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.template_path = Some(path.as_ref().to_path_buf());
        self
    }
}

/// Renders an HTML page summarizing a weighted portfolio.
///
/// The page carries the yearly statistics, the weights, the per-asset
/// return plots, the portfolio's own return plot and rolling means of the
/// portfolio value (growth of 1 unit invested on the first date).
pub fn html(
    prices: &PriceFrame,
    weights: &Weights,
    options: HtmlReportOptions,
) -> Result<String, ReportError> {
    let port = portfolio_returns(weights, prices)?;
    let relative = cumulative_relative_returns(&port);
    let stats = yearly_statistics(&relative.values, options.days_per_year)?;

    let mut value = Vec::with_capacity(prices.len());
    value.push(1.0);
    value.extend(relative.values.iter().map(|r| 1.0 + r));
    let portfolio_value = PriceSeries::new(prices.dates.clone(), value, port.name.clone())?;

    let plot_options = PlotOptions::default();
    let asset_figures = plots::plot_returns(prices, &plot_options)?;
    let portfolio_figure = plots::plot_series_returns(&portfolio_value, &plot_options)?;
    let rolling_figure =
        plots::plot_rollings(&portfolio_value, &options.rolling_windows, &plot_options)?;

    let mut tpl = if let Some(path) = &options.template_path {
        std::fs::read_to_string(path)?
    } else {
        DEFAULT_TEMPLATE.to_string()
    };

    let date_range = match prices.date_range() {
        Some((start, end)) => format!(
            "{} - {}",
            start.format("%e %b, %Y").to_string().trim(),
            end.format("%e %b, %Y").to_string().trim()
        ),
        None => String::new(),
    };

    tpl = tpl.replace("{{title}}", &escape_text(&options.title));
    tpl = tpl.replace("{{date_range}}", &date_range);
    tpl = tpl.replace("{{v}}", VERSION);
    tpl = tpl.replace("{{statistics}}", &build_statistics_table(&stats));
    tpl = tpl.replace("{{weights}}", &build_weights_table(prices, weights));
    tpl = tpl.replace("{{asset_plots}}", &join_figures(&asset_figures));
    tpl = tpl.replace("{{portfolio_plot}}", &portfolio_figure.to_html());
    tpl = tpl.replace("{{rolling_plot}}", &rolling_figure.to_html());

    if let Some(path) = &options.output {
        std::fs::write(path, &tpl)?;
        info!("wrote portfolio report to {}", path.display());
    }

    Ok(tpl)
}

fn build_statistics_table(stats: &YearlyStatistics) -> String {
    format!(
        "<table>\n<tbody>\n\
         <tr><td>Total return</td><td>{:.2}%</td></tr>\n\
         <tr><td>Average yearly return</td><td>{:.2}%</td></tr>\n\
         <tr><td>Years</td><td>{:.2}</td></tr>\n\
         </tbody>\n</table>",
        100.0 * stats.total_return,
        100.0 * stats.average_yearly_return,
        stats.years
    )
}

fn build_weights_table(prices: &PriceFrame, weights: &Weights) -> String {
    match weights {
        Weights::Static(w) => {
            let mut html = String::from("<table>\n<thead>\n<tr><th>Asset</th><th>Weight</th></tr>\n</thead>\n<tbody>\n");
            for (name, weight) in prices.names.iter().zip(w.iter()) {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{:.4}</td></tr>\n",
                    escape_text(name),
                    weight
                ));
            }
            html.push_str("</tbody>\n</table>");
            html
        }
        Weights::Dynamic(w) => format!(
            "<p>Time-varying weights over {} assets and {} periods.</p>",
            w.ncols(),
            w.nrows()
        ),
    }
}

fn join_figures(figures: &[Figure]) -> String {
    figures
        .iter()
        .map(Figure::to_html)
        .collect::<Vec<_>>()
        .join("\n")
}
