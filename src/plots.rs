use std::path::Path;

use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use crate::stats::{cumulative_log_returns, cumulative_relative_returns, log_returns, rolling_mean};
use crate::utils::{DataError, PriceFrame, PriceSeries, ReturnSeries};

const DEFAULT_DPI: f64 = 72.0;
const LEFT_PAD: f64 = 72.0;
const RIGHT_PAD: f64 = 24.0;
const TOP_PAD: f64 = 24.0;
const BOTTOM_PAD: f64 = 48.0;
const MAX_TIME_LABELS: usize = 12;
const Y_TICKS: usize = 5;

const LOG_COLOR: &str = "blue";
const RELATIVE_COLOR: &str = "red";
const PRICE_COLOR: &str = "blue";
// Matplotlib's default color cycle.
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const LOG_RETURNS_LABEL: &str = "Cumulative log returns";
const RELATIVE_RETURNS_LABEL: &str = "Total relative returns (%)";

/// Rendering options shared by all plots.
#[derive(Clone, Debug)]
pub struct PlotOptions {
    /// Legend label for single-series plots; falls back to the series name.
    pub name: Option<String>,
    /// Pixels per inch used to convert figure sizes.
    pub dpi: f64,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            name: None,
            dpi: DEFAULT_DPI,
        }
    }
}

impl PlotOptions {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    fn size(&self, inches: (f64, f64)) -> (f64, f64) {
        let dpi = if self.dpi.is_finite() && self.dpi > 0.0 {
            self.dpi
        } else {
            DEFAULT_DPI
        };
        (inches.0 * dpi, inches.1 * dpi)
    }
}

/// A rendered SVG figure.
#[derive(Clone, Debug)]
pub struct Figure {
    pub title: String,
    pub svg: String,
}

impl Figure {
    /// Writes the SVG document to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path.as_ref(), &self.svg)?;
        debug!("saved figure '{}' to {}", self.title, path.as_ref().display());
        Ok(())
    }

    /// The figure wrapped in a titled `div`, for embedding in HTML pages.
    pub fn to_html(&self) -> String {
        format!(
            r#"<div class="ar-plot"><div class="ar-plot-title">{title}</div>{svg}</div>"#,
            title = escape_text(&self.title),
            svg = self.svg
        )
    }
}

struct IndexedSeries {
    label: Option<String>,
    color: &'static str,
    stroke_width: f64,
    points: Vec<(usize, f64)>,
}

struct Panel {
    y_label: &'static str,
    x_label: Option<&'static str>,
    series: Vec<IndexedSeries>,
}

struct LegendEntry {
    label: String,
    color: &'static str,
}

/// Plots cumulative log and relative returns of a single price series.
///
/// The figure has two stacked panels: cumulative log returns in blue on
/// top, `exp(cumsum) - 1` in red below.
pub fn plot_series_returns(
    prices: &PriceSeries,
    options: &PlotOptions,
) -> Result<Figure, DataError> {
    info!("Cumulative returns and log returns");
    let log_rets = log_returns(prices)?;
    let label = options
        .name
        .clone()
        .or_else(|| prices.name.clone())
        .unwrap_or_default();

    let panels = vec![
        Panel {
            y_label: LOG_RETURNS_LABEL,
            x_label: None,
            series: vec![curve(&label, LOG_COLOR, &cumulative_log_returns(&log_rets))],
        },
        Panel {
            y_label: RELATIVE_RETURNS_LABEL,
            x_label: None,
            series: vec![curve(
                &label,
                RELATIVE_COLOR,
                &cumulative_relative_returns(&log_rets),
            )],
        },
    ];

    let title = if label.is_empty() {
        "Cumulative returns".to_string()
    } else {
        format!("{label} cumulative returns")
    };
    Ok(render_figure(
        &title,
        &log_rets.dates,
        &panels,
        options.size((16.0, 12.0)),
    ))
}

/// Plots cumulative log and relative returns for every asset in a frame.
///
/// A single-column frame yields one two-panel figure, exactly like
/// [`plot_series_returns`]. With several assets two figures are produced,
/// cumulative log returns then relative returns, with one curve per asset.
pub fn plot_returns(prices: &PriceFrame, options: &PlotOptions) -> Result<Vec<Figure>, DataError> {
    if prices.asset_count() == 1 {
        let series = prices.series(0).ok_or(DataError::Empty)?;
        return Ok(vec![plot_series_returns(&series, options)?]);
    }

    info!("Cumulative returns and log returns");
    let mut log_curves = Vec::with_capacity(prices.asset_count());
    let mut relative_curves = Vec::with_capacity(prices.asset_count());
    let mut dates: Vec<NaiveDate> = Vec::new();

    for (i, series) in (0..prices.asset_count())
        .filter_map(|i| prices.series(i))
        .enumerate()
    {
        let log_rets = log_returns(&series)?;
        let label = series.name.clone().unwrap_or_default();
        let color = PALETTE[i % PALETTE.len()];
        log_curves.push(curve(&label, color, &cumulative_log_returns(&log_rets)));
        relative_curves.push(curve(&label, color, &cumulative_relative_returns(&log_rets)));
        dates = log_rets.dates;
    }

    let size = options.size((16.0, 6.0));
    let log_figure = render_figure(
        "Cumulative log returns",
        &dates,
        &[Panel {
            y_label: LOG_RETURNS_LABEL,
            x_label: None,
            series: log_curves,
        }],
        size,
    );
    let relative_figure = render_figure(
        "Total relative returns",
        &dates,
        &[Panel {
            y_label: RELATIVE_RETURNS_LABEL,
            x_label: None,
            series: relative_curves,
        }],
        size,
    );

    Ok(vec![log_figure, relative_figure])
}

/// Plots a price series with one trailing rolling mean per window size.
pub fn plot_rollings(
    prices: &PriceSeries,
    windows: &[usize],
    options: &PlotOptions,
) -> Result<Figure, DataError> {
    let label = options
        .name
        .clone()
        .or_else(|| prices.name.clone())
        .unwrap_or_default();

    let mut series = vec![IndexedSeries {
        label: Some(label.clone()).filter(|l| !l.is_empty()),
        color: PRICE_COLOR,
        stroke_width: 1.5,
        points: prices.values.iter().copied().enumerate().collect(),
    }];

    for (i, window) in windows.iter().enumerate() {
        series.push(IndexedSeries {
            label: Some(format!("{window} days rolling")),
            color: PALETTE[(i + 1) % PALETTE.len()],
            stroke_width: 1.2,
            points: rolling_mean(&prices.values, *window)?,
        });
    }

    let title = if label.is_empty() {
        "Rolling means".to_string()
    } else {
        format!("{label} rolling means")
    };
    Ok(render_rolling_figure(&title, &prices.dates, series, options))
}

/// Plots every asset of a frame on one axis, each followed by its rolling
/// means labelled `"{asset} {w} days rolling"`.
///
/// A single-column frame renders exactly like [`plot_rollings`].
pub fn plot_frame_rollings(
    prices: &PriceFrame,
    windows: &[usize],
    options: &PlotOptions,
) -> Result<Figure, DataError> {
    if prices.asset_count() == 1 {
        let series = prices.series(0).ok_or(DataError::Empty)?;
        return plot_rollings(&series, windows, options);
    }

    let mut series = Vec::with_capacity(prices.asset_count() * (windows.len() + 1));
    let mut color_idx = 0;
    for (col, name) in prices.names.iter().enumerate() {
        let values = prices.column(col).to_vec();
        series.push(IndexedSeries {
            label: Some(name.clone()),
            color: PALETTE[color_idx % PALETTE.len()],
            stroke_width: 1.5,
            points: values.iter().copied().enumerate().collect(),
        });
        color_idx += 1;

        for window in windows {
            series.push(IndexedSeries {
                label: Some(format!("{name} {window} days rolling")),
                color: PALETTE[color_idx % PALETTE.len()],
                stroke_width: 1.2,
                points: rolling_mean(&values, *window)?,
            });
            color_idx += 1;
        }
    }

    Ok(render_rolling_figure(
        "Rolling means",
        &prices.dates,
        series,
        options,
    ))
}

fn render_rolling_figure(
    title: &str,
    dates: &[NaiveDate],
    series: Vec<IndexedSeries>,
    options: &PlotOptions,
) -> Figure {
    render_figure(
        title,
        dates,
        &[Panel {
            y_label: "Adjusted closing price ($)",
            x_label: Some("Date"),
            series,
        }],
        options.size((16.0, 9.0)),
    )
}

fn curve(label: &str, color: &'static str, series: &ReturnSeries) -> IndexedSeries {
    IndexedSeries {
        label: Some(label.to_string()).filter(|l| !l.is_empty()),
        color,
        stroke_width: 1.5,
        points: series.values.iter().copied().enumerate().collect(),
    }
}

fn render_figure(
    title: &str,
    dates: &[NaiveDate],
    panels: &[Panel],
    (width, height): (f64, f64),
) -> Figure {
    debug!(
        "rendering '{}' with {} panel(s) over {} dates",
        title,
        panels.len(),
        dates.len()
    );

    let mut svg = svg_header(width, height);
    let panel_height = height / panels.len().max(1) as f64;
    for (i, panel) in panels.iter().enumerate() {
        render_panel(&mut svg, dates, panel, width, i as f64 * panel_height, panel_height);
    }
    svg.push_str(svg_footer());

    Figure {
        title: title.to_string(),
        svg,
    }
}

fn render_panel(
    svg: &mut String,
    dates: &[NaiveDate],
    panel: &Panel,
    width: f64,
    top: f64,
    height: f64,
) {
    let plot_top = top + TOP_PAD;
    let plot_height = (height - TOP_PAD - BOTTOM_PAD).max(1.0);
    let xs = x_positions(dates.len(), width);

    if let Some((min_v, max_v)) = extent_from_series(&panel.series) {
        add_value_axis(svg, min_v, max_v, width, plot_top, plot_height);

        let mut legend_entries = Vec::new();
        for series in &panel.series {
            let coords: Vec<(f64, f64)> = series
                .points
                .iter()
                .filter(|(idx, value)| *idx < xs.len() && value.is_finite())
                .map(|(idx, value)| {
                    (
                        xs[*idx],
                        scale_value(*value, min_v, max_v, plot_top, plot_height),
                    )
                })
                .collect();
            if coords.is_empty() {
                continue;
            }
            svg.push_str(&polyline(&coords, series.color, series.stroke_width));

            if let Some(label) = &series.label {
                legend_entries.push(LegendEntry {
                    label: label.clone(),
                    color: series.color,
                });
            }
        }

        draw_line_legend(svg, &legend_entries, plot_top);
    }

    add_time_axis(svg, dates, &xs, plot_top + plot_height + 5.0);

    let mid_y = plot_top + plot_height / 2.0;
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" transform="rotate(-90 {x:.2} {y:.2})" font-size="12">{label}</text>"#,
        x = 16.0,
        y = mid_y,
        label = escape_text(panel.y_label)
    ));
    if let Some(x_label) = panel.x_label {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" font-size="12">{label}</text>"#,
            x = LEFT_PAD + (width - LEFT_PAD - RIGHT_PAD) / 2.0,
            y = top + height - 6.0,
            label = x_label
        ));
    }
}

fn extent_from_series(series_list: &[IndexedSeries]) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;

    for value in series_list
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .filter(|v| v.is_finite())
    {
        min_v = min_v.min(value);
        max_v = max_v.max(value);
    }

    if !min_v.is_finite() || !max_v.is_finite() {
        return None;
    }

    if min_v == max_v {
        let adjust = if min_v == 0.0 { 1.0 } else { min_v.abs() * 0.1 }; // widen flat ranges
        min_v -= adjust;
        max_v += adjust;
    }

    Some((min_v, max_v))
}

fn scale_value(value: f64, min_v: f64, max_v: f64, top: f64, height: f64) -> f64 {
    if (max_v - min_v).abs() < f64::EPSILON {
        return top + height / 2.0;
    }

    let norm = (value - min_v) / (max_v - min_v);
    top + (1.0 - norm) * height
}

fn x_positions(len: usize, width: f64) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }

    let inner_width = width - LEFT_PAD - RIGHT_PAD;
    if len == 1 {
        return vec![LEFT_PAD + inner_width / 2.0];
    }

    (0..len)
        .map(|i| LEFT_PAD + inner_width * (i as f64 / (len - 1) as f64))
        .collect()
}

fn polyline(points: &[(f64, f64)], stroke: &str, stroke_width: f64) -> String {
    let coords = points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<polyline fill="none" stroke="{stroke}" stroke-width="{stroke_width}" points="{coords}" />"#
    )
}

fn draw_line_legend(svg: &mut String, entries: &[LegendEntry], top: f64) {
    let mut y = top + 14.0;
    let x = LEFT_PAD + 10.0;
    for entry in entries {
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1.5" />"#,
            x1 = x,
            x2 = x + 20.0,
            y = y - 4.0,
            color = entry.color
        ));
        svg.push_str(&format!(
            r##"<text x="{x:.2}" y="{y:.2}" text-anchor="start" fill="#333">{label}</text>"##,
            x = x + 26.0,
            y = y,
            label = escape_text(&entry.label)
        ));
        y += 16.0;
    }
}

fn add_value_axis(svg: &mut String, min_v: f64, max_v: f64, width: f64, top: f64, height: f64) {
    svg.push_str(&format!(
        r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#000" stroke-width="1" />"##,
        x = LEFT_PAD,
        y1 = top,
        y2 = top + height
    ));

    for i in 0..Y_TICKS {
        let value = min_v + (max_v - min_v) * i as f64 / (Y_TICKS - 1) as f64;
        let y = scale_value(value, min_v, max_v, top, height);
        svg.push_str(&format!(
            r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#dddddd" stroke-width="0.5" />"##,
            x1 = LEFT_PAD,
            x2 = width - RIGHT_PAD,
            y = y
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{label}</text>"#,
            x = LEFT_PAD - 6.0,
            y = y + 3.0,
            label = format_tick(value, max_v - min_v)
        ));
    }
}

fn add_time_axis(svg: &mut String, dates: &[NaiveDate], xs: &[f64], axis_y: f64) {
    let (Some(first), Some(last)) = (xs.first(), xs.last()) else {
        return;
    };

    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#000" stroke-width="1" />"##,
        x1 = first,
        x2 = last,
        y = axis_y
    ));

    // First observation of every month, thinned to keep labels readable.
    let mut month_starts = Vec::new();
    let mut last_month: Option<(i32, u32)> = None;
    for (idx, date) in dates.iter().enumerate().take(xs.len()) {
        let key = (date.year(), date.month());
        if last_month != Some(key) {
            last_month = Some(key);
            month_starts.push(idx);
        }
    }
    let stride = month_starts.len().div_ceil(MAX_TIME_LABELS).max(1);

    for idx in month_starts.into_iter().step_by(stride) {
        let x = xs[idx];
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#ccc" stroke-width="1" />"##,
            x = x,
            y1 = axis_y,
            y2 = axis_y + 4.0
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            x = x,
            y = axis_y + 16.0,
            label = dates[idx].format("%Y-%m")
        ));
    }
}

fn format_tick(value: f64, span: f64) -> String {
    if span >= 10.0 {
        format!("{value:.0}")
    } else if span >= 0.1 {
        format!("{value:.2}")
    } else {
        format!("{value:.4}")
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn svg_header(width: f64, height: f64) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style><rect width="100%" height="100%" fill="white" />"#,
        w = width,
        h = height
    )
}

fn svg_footer() -> &'static str {
    "</svg>"
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2022, 12, 1).expect("valid date");
        (0..n).map(|i| start + chrono::Days::new(i as u64 * 7)).collect()
    }

    fn frame() -> PriceFrame {
        PriceFrame::new(
            dates(5),
            vec!["AAPL".into(), "MSFT".into()],
            array![
                [100.0, 200.0],
                [102.0, 198.0],
                [101.0, 205.0],
                [105.0, 210.0],
                [107.0, 207.0]
            ],
        )
        .expect("valid frame")
    }

    #[test]
    fn single_series_renders_two_panels() {
        let prices = frame().series(0).expect("column");
        let fig = plot_series_returns(&prices, &PlotOptions::default().with_name("Apple"))
            .expect("figure");

        assert!(fig.svg.starts_with("<svg"));
        assert!(fig.svg.ends_with("</svg>"));
        assert_eq!(fig.svg.matches("<polyline").count(), 2);
        assert!(fig.svg.contains(LOG_RETURNS_LABEL));
        assert!(fig.svg.contains(RELATIVE_RETURNS_LABEL));
        assert!(fig.svg.contains(r#"stroke="blue""#));
        assert!(fig.svg.contains(r#"stroke="red""#));
        assert!(fig.svg.contains(">Apple</text>"));
        assert!(fig.svg.contains(r#"width="1152" height="864""#));
    }

    #[test]
    fn multi_asset_renders_two_figures_with_a_curve_per_asset() {
        let figures = plot_returns(&frame(), &PlotOptions::default()).expect("figures");
        assert_eq!(figures.len(), 2);
        for fig in &figures {
            assert_eq!(fig.svg.matches("<polyline").count(), 2);
            assert!(fig.svg.contains(">AAPL</text>"));
            assert!(fig.svg.contains(">MSFT</text>"));
        }
        assert!(figures[0].svg.contains(LOG_RETURNS_LABEL));
        assert!(figures[1].svg.contains(RELATIVE_RETURNS_LABEL));
    }

    #[test]
    fn single_column_frame_uses_stacked_layout() {
        let single = PriceFrame::new(
            dates(3),
            vec!["SPY".into()],
            array![[1.0], [1.1], [1.2]],
        )
        .expect("valid frame");
        let figures = plot_returns(&single, &PlotOptions::default()).expect("figures");
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].title, "SPY cumulative returns");
    }

    #[test]
    fn rollings_add_one_curve_per_window() {
        let prices = frame().series(1).expect("column");
        let fig = plot_rollings(&prices, &[2, 3], &PlotOptions::default()).expect("figure");
        assert_eq!(fig.svg.matches("<polyline").count(), 3);
        assert!(fig.svg.contains("2 days rolling"));
        assert!(fig.svg.contains("3 days rolling"));
        assert!(fig.svg.contains(">Date</text>"));
        assert!(fig.svg.contains("Adjusted closing price ($)"));
    }

    #[test]
    fn rolling_window_longer_than_series_draws_nothing() {
        let prices = frame().series(1).expect("column");
        let fig = plot_rollings(&prices, &[50], &PlotOptions::default()).expect("figure");
        assert_eq!(fig.svg.matches("<polyline").count(), 1);
        assert!(!fig.svg.contains("50 days rolling"));
    }

    #[test]
    fn frame_rollings_draw_every_asset_and_window() {
        let fig = plot_frame_rollings(&frame(), &[2, 3], &PlotOptions::default()).expect("figure");
        assert_eq!(fig.svg.matches("<polyline").count(), 6);
        assert!(fig.svg.contains(">AAPL</text>"));
        assert!(fig.svg.contains("AAPL 2 days rolling"));
        assert!(fig.svg.contains("MSFT 3 days rolling"));
        assert!(fig.svg.contains(r#"width="1152" height="648""#));
    }

    #[test]
    fn single_column_frame_rollings_match_series_rollings() {
        let single = PriceFrame::new(
            dates(4),
            vec!["SPY".into()],
            array![[1.0], [1.1], [1.2], [1.3]],
        )
        .expect("valid frame");
        let options = PlotOptions::default();
        let from_frame = plot_frame_rollings(&single, &[2], &options).expect("figure");
        let from_series =
            plot_rollings(&single.series(0).expect("column"), &[2], &options).expect("figure");
        assert_eq!(from_frame.svg, from_series.svg);
        assert_eq!(from_frame.title, "SPY rolling means");
    }

    #[test]
    fn rollings_reject_zero_window() {
        let prices = frame().series(0).expect("column");
        assert_eq!(
            plot_rollings(&prices, &[0], &PlotOptions::default()).unwrap_err(),
            DataError::InvalidWindow
        );
    }

    #[test]
    fn labels_are_escaped() {
        let prices = frame().series(0).expect("column");
        let fig = plot_series_returns(&prices, &PlotOptions::default().with_name("S&P <500>"))
            .expect("figure");
        assert!(fig.svg.contains("S&amp;P &lt;500&gt;"));
        assert!(fig.to_html().contains("S&amp;P &lt;500&gt; cumulative returns"));
    }

    #[test]
    fn time_axis_labels_are_thinned() {
        let xs = x_positions(400, 1000.0);
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
        let many: Vec<NaiveDate> = (0..400).map(|i| start + chrono::Days::new(i * 3)).collect();
        let mut svg = String::new();
        add_time_axis(&mut svg, &many, &xs, 100.0);
        assert!(svg.matches("<text").count() <= MAX_TIME_LABELS);
    }
}
