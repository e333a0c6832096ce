use std::fmt;

use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};

use crate::utils::{DataError, PriceFrame, PriceSeries, ReturnFrame, ReturnSeries, Weights};

/// Trading days per year assumed when annualizing (52 weeks of 5 days).
pub const DEFAULT_DAYS_PER_YEAR: u32 = 52 * 5;

/// Simple percentage change between consecutive prices.
///
/// The first observation has no predecessor and is dropped, so the result
/// is one element shorter than `prices`.
pub fn returns(prices: &PriceSeries) -> Result<ReturnSeries, DataError> {
    let values = simple_changes(&prices.values)?;
    Ok(ReturnSeries {
        dates: prices.dates[1..].to_vec(),
        values,
        name: prices.name.clone(),
    })
}

/// Natural-log difference between consecutive prices.
///
/// Every price must be strictly positive.
pub fn log_returns(prices: &PriceSeries) -> Result<ReturnSeries, DataError> {
    let values = log_changes(&prices.values)?;
    Ok(ReturnSeries {
        dates: prices.dates[1..].to_vec(),
        values,
        name: prices.name.clone(),
    })
}

/// [`returns`] applied to every column of a frame.
pub fn returns_frame(prices: &PriceFrame) -> Result<ReturnFrame, DataError> {
    map_columns(prices, simple_changes)
}

/// [`log_returns`] applied to every column of a frame.
pub fn log_returns_frame(prices: &PriceFrame) -> Result<ReturnFrame, DataError> {
    map_columns(prices, log_changes)
}

/// Weighted log return of a portfolio at each time step.
///
/// Computes per-asset log returns and, for every row `t`, the sum
/// `Σ_i weight[i] * log_return[i][t]`. Static weights need one entry per
/// asset; dynamic weights need one row per return row.
pub fn portfolio_returns(
    weights: &Weights,
    prices: &PriceFrame,
) -> Result<ReturnSeries, DataError> {
    let log_rets = log_returns_frame(prices)?;
    let shape = log_rets.values.dim();

    let values: Array1<f64> = match weights {
        Weights::Static(w) => {
            if w.len() != shape.1 {
                return Err(DataError::DimensionMismatch {
                    expected: (shape.1, 1),
                    actual: (w.len(), 1),
                });
            }
            log_rets.values.dot(w)
        }
        Weights::Dynamic(w) => {
            if w.dim() != shape {
                return Err(DataError::DimensionMismatch {
                    expected: shape,
                    actual: w.dim(),
                });
            }
            // Row-wise dot product, the diagonal of W · Rᵀ.
            (w * &log_rets.values).sum_axis(Axis(1))
        }
    };

    debug!(
        "portfolio returns over {} assets and {} periods",
        shape.1, shape.0
    );

    Ok(ReturnSeries {
        dates: log_rets.dates,
        values: values.to_vec(),
        name: Some("Portfolio".to_string()),
    })
}

/// Running sum of log returns.
pub fn cumulative_log_returns(log_returns: &ReturnSeries) -> ReturnSeries {
    log_returns.with_values(cumsum(&log_returns.values))
}

/// Growth relative to the first price, `exp(cumsum) - 1`.
pub fn cumulative_relative_returns(log_returns: &ReturnSeries) -> ReturnSeries {
    let values = cumsum(&log_returns.values)
        .into_iter()
        .map(|v| v.exp() - 1.0)
        .collect();
    log_returns.with_values(values)
}

/// Trailing mean over `window` observations.
///
/// Points are `(index, mean)` where `index` is the last observation of the
/// window, so the first point sits at `window - 1`.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<(usize, f64)>, DataError> {
    if window == 0 {
        return Err(DataError::InvalidWindow);
    }
    if values.len() < window {
        warn!(
            "rolling window of {} exceeds series length {}",
            window,
            values.len()
        );
    }
    Ok(rolling_apply_indexed(values, window, |win| {
        win.iter().sum::<f64>() / win.len() as f64
    }))
}

/// Total and compounded annual return of a cumulative relative return curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YearlyStatistics {
    pub total_return: f64,
    pub average_yearly_return: f64,
    pub years: f64,
}

impl fmt::Display for YearlyStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total portfolio return is: {:5.2}%",
            100.0 * self.total_return
        )?;
        write!(
            f,
            "Average yearly return is: {:5.2}%",
            100.0 * self.average_yearly_return
        )
    }
}

/// Summarizes a cumulative relative return curve.
///
/// The number of observations is taken as elapsed trading days and the
/// final value as the total return; the average is compounded:
/// `(1 + total)^(1 / years) - 1`.
pub fn yearly_statistics(
    cumulative_relative_returns: &[f64],
    days_per_year: u32,
) -> Result<YearlyStatistics, DataError> {
    if days_per_year == 0 {
        return Err(DataError::InvalidPeriods);
    }
    let total_return = *cumulative_relative_returns
        .last()
        .ok_or(DataError::Empty)?;

    let years = cumulative_relative_returns.len() as f64 / days_per_year as f64;
    let average_yearly_return = (1.0 + total_return).powf(1.0 / years) - 1.0;

    Ok(YearlyStatistics {
        total_return,
        average_yearly_return,
        years,
    })
}

fn simple_changes(prices: &[f64]) -> Result<Vec<f64>, DataError> {
    require_pair(prices.len())?;
    prices
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            if pair[0] == 0.0 {
                Err(DataError::DivisionByZero { index: i })
            } else {
                Ok((pair[1] - pair[0]) / pair[0])
            }
        })
        .collect()
}

fn log_changes(prices: &[f64]) -> Result<Vec<f64>, DataError> {
    require_pair(prices.len())?;
    if let Some((index, value)) = prices.iter().enumerate().find(|(_, p)| **p <= 0.0) {
        return Err(DataError::NonPositivePrice {
            index,
            value: *value,
        });
    }
    Ok(prices
        .windows(2)
        .map(|pair| pair[1].ln() - pair[0].ln())
        .collect())
}

fn require_pair(len: usize) -> Result<(), DataError> {
    if len < 2 {
        return Err(DataError::InsufficientData {
            required: 2,
            actual: len,
        });
    }
    Ok(())
}

fn map_columns(
    prices: &PriceFrame,
    f: impl Fn(&[f64]) -> Result<Vec<f64>, DataError>,
) -> Result<ReturnFrame, DataError> {
    require_pair(prices.len())?;
    let (rows, cols) = prices.values.dim();
    let mut values = Array2::zeros((rows - 1, cols));

    for col in 0..cols {
        let column: Vec<f64> = prices.column(col).to_vec();
        let changes = f(&column).map_err(|err| {
            debug!("column {} ({}) failed: {}", col, prices.names[col], err);
            err
        })?;
        values.column_mut(col).assign(&Array1::from(changes));
    }

    Ok(ReturnFrame {
        dates: prices.dates[1..].to_vec(),
        names: prices.names.clone(),
        values,
    })
}

fn cumsum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0_f64, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

fn rolling_apply_indexed(
    values: &[f64],
    window: usize,
    f: impl Fn(&[f64]) -> f64,
) -> Vec<(usize, f64)> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len() - window + 1);
    for end in window - 1..values.len() {
        let start = end + 1 - window;
        out.push((end, f(&values[start..=end])));
    }
    out
}
