use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

/// Errors raised while building or transforming price and return series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("time series is empty")]
    Empty,

    #[error("time series length mismatch: {dates} dates vs {values} values")]
    LengthMismatch { dates: usize, values: usize },

    #[error("column {column} is not aligned: expected {expected}, found {actual}")]
    DateMismatch {
        column: usize,
        expected: NaiveDate,
        actual: NaiveDate,
    },

    #[error("duplicate observation date {0}")]
    DuplicateDate(NaiveDate),

    #[error("non-finite value {value} at row {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Logarithm is undefined for prices at or below zero.
    #[error("non-positive price {value} at row {index}")]
    NonPositivePrice { index: usize, value: f64 },

    #[error("division by zero price at row {index}")]
    DivisionByZero { index: usize },

    #[error("incompatible dimensions: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("rolling window must be at least 1")]
    InvalidWindow,

    #[error("periods per year must be positive")]
    InvalidPeriods,
}

/// Dated single-asset prices.
#[derive(Clone, Debug)]
pub struct PriceSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub name: Option<String>,
}

impl PriceSeries {
    pub fn new(
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
        name: Option<String>,
    ) -> Result<Self, DataError> {
        if dates.is_empty() || values.is_empty() {
            return Err(DataError::Empty);
        }

        if dates.len() != values.len() {
            return Err(DataError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }

        if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DataError::NonFinite {
                index,
                value: *value,
            });
        }

        let mut paired: Vec<(NaiveDate, f64)> = dates.into_iter().zip(values).collect();
        paired.sort_by_key(|(d, _)| *d);
        check_unique(paired.iter().map(|(d, _)| d))?;

        let (sorted_dates, sorted_values): (Vec<_>, Vec<_>) = paired.into_iter().unzip();

        Ok(Self {
            dates: sorted_dates,
            values: sorted_values,
            name,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }
}

/// Prices for several assets sharing one date index.
///
/// Rows of `values` are observations, columns are assets in `names` order.
#[derive(Clone, Debug)]
pub struct PriceFrame {
    pub dates: Vec<NaiveDate>,
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl PriceFrame {
    pub fn new(
        dates: Vec<NaiveDate>,
        names: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, DataError> {
        let (rows, cols) = values.dim();
        if dates.is_empty() || rows == 0 || cols == 0 {
            return Err(DataError::Empty);
        }

        if dates.len() != rows {
            return Err(DataError::LengthMismatch {
                dates: dates.len(),
                values: rows,
            });
        }

        if names.len() != cols {
            return Err(DataError::DimensionMismatch {
                expected: (rows, names.len()),
                actual: (rows, cols),
            });
        }

        for (index, row) in values.axis_iter(Axis(0)).enumerate() {
            if let Some(value) = row.iter().find(|v| !v.is_finite()) {
                return Err(DataError::NonFinite {
                    index,
                    value: *value,
                });
            }
        }

        let mut order: Vec<usize> = (0..rows).collect();
        order.sort_by_key(|&i| dates[i]);
        let sorted_dates: Vec<NaiveDate> = order.iter().map(|&i| dates[i]).collect();
        check_unique(sorted_dates.iter())?;
        let sorted_values = values.select(Axis(0), &order);

        Ok(Self {
            dates: sorted_dates,
            names,
            values: sorted_values,
        })
    }

    /// Builds a frame from individual series that share the same dates.
    pub fn from_series(series: &[PriceSeries]) -> Result<Self, DataError> {
        let first = series.first().ok_or(DataError::Empty)?;
        let rows = first.len();
        let mut values = Array2::zeros((rows, series.len()));
        let mut names = Vec::with_capacity(series.len());

        for (col, s) in series.iter().enumerate() {
            if s.len() != rows {
                return Err(DataError::LengthMismatch {
                    dates: rows,
                    values: s.len(),
                });
            }
            if let Some((expected, actual)) = first
                .dates
                .iter()
                .zip(&s.dates)
                .find(|(a, b)| a != b)
            {
                return Err(DataError::DateMismatch {
                    column: col,
                    expected: *expected,
                    actual: *actual,
                });
            }
            values.column_mut(col).assign(&Array1::from(s.values.clone()));
            names.push(
                s.name
                    .clone()
                    .unwrap_or_else(|| format!("asset_{}", col + 1)),
            );
        }

        Self::new(first.dates.clone(), names, values)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn asset_count(&self) -> usize {
        self.names.len()
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.column(index)
    }

    /// Extracts one asset as a standalone series.
    pub fn series(&self, index: usize) -> Option<PriceSeries> {
        let name = self.names.get(index)?;
        Some(PriceSeries {
            dates: self.dates.clone(),
            values: self.values.column(index).to_vec(),
            name: Some(name.clone()),
        })
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }
}

/// Per-period returns (simple or log) indexed by the later date of each pair.
#[derive(Clone, Debug)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub name: Option<String>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Value of the final observation.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Same dates and name, different values.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        Self {
            dates: self.dates.clone(),
            values,
            name: self.name.clone(),
        }
    }
}

/// Returns for several assets; columns follow the source frame.
#[derive(Clone, Debug)]
pub struct ReturnFrame {
    pub dates: Vec<NaiveDate>,
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl ReturnFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn series(&self, index: usize) -> Option<ReturnSeries> {
        let name = self.names.get(index)?;
        Some(ReturnSeries {
            dates: self.dates.clone(),
            values: self.values.column(index).to_vec(),
            name: Some(name.clone()),
        })
    }

    pub fn iter_series(&self) -> impl Iterator<Item = ReturnSeries> + '_ {
        (0..self.names.len()).filter_map(move |i| self.series(i))
    }
}

/// Asset weights used to aggregate per-asset returns.
#[derive(Clone, Debug)]
pub enum Weights {
    /// One weight per asset, applied at every time step.
    Static(Array1<f64>),
    /// One row of asset weights per return row.
    Dynamic(Array2<f64>),
}

impl From<Vec<f64>> for Weights {
    fn from(weights: Vec<f64>) -> Self {
        Weights::Static(Array1::from(weights))
    }
}

impl From<&[f64]> for Weights {
    fn from(weights: &[f64]) -> Self {
        Weights::Static(Array1::from(weights.to_vec()))
    }
}

impl From<Array1<f64>> for Weights {
    fn from(weights: Array1<f64>) -> Self {
        Weights::Static(weights)
    }
}

impl From<Array2<f64>> for Weights {
    fn from(weights: Array2<f64>) -> Self {
        Weights::Dynamic(weights)
    }
}

fn check_unique<'a>(sorted: impl Iterator<Item = &'a NaiveDate>) -> Result<(), DataError> {
    let mut previous: Option<&NaiveDate> = None;
    for date in sorted {
        if previous == Some(date) {
            return Err(DataError::DuplicateDate(*date));
        }
        previous = Some(date);
    }
    Ok(())
}
