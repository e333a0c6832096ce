mod plots;
mod reports;
mod stats;
mod utils;

pub use crate::plots::{
    plot_frame_rollings, plot_returns, plot_rollings, plot_series_returns, Figure, PlotOptions,
};
pub use crate::reports::{html, print_yearly_statistics, HtmlReportOptions, ReportError};
pub use crate::stats::{
    cumulative_log_returns, cumulative_relative_returns, log_returns, log_returns_frame,
    portfolio_returns, returns, returns_frame, rolling_mean, yearly_statistics, YearlyStatistics,
    DEFAULT_DAYS_PER_YEAR,
};
pub use crate::utils::{DataError, PriceFrame, PriceSeries, ReturnFrame, ReturnSeries, Weights};
