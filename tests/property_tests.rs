//! Property-based tests for return invariants.
//!
//! - Returns are one observation shorter than prices
//! - Constant prices give zero returns
//! - Cumulative relative returns recover the price ratio
//! - A unit weight on one asset reproduces that asset's log returns

use asset_returns::{
    cumulative_relative_returns, log_returns, portfolio_returns, returns, rolling_mean,
    PriceFrame, PriceSeries, Weights,
};
use chrono::NaiveDate;
use ndarray::Array2;
use proptest::prelude::*;

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
    (0..n).map(|i| start + chrono::Days::new(i as u64)).collect()
}

fn prices_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01_f64..10_000.0, 2..200)
}

proptest! {
    #[test]
    fn returns_drop_the_first_observation(prices in prices_strategy()) {
        let series = PriceSeries::new(dates(prices.len()), prices.clone(), None).unwrap();
        let simple = returns(&series).unwrap();
        let log = log_returns(&series).unwrap();
        prop_assert_eq!(simple.len(), prices.len() - 1);
        prop_assert_eq!(log.len(), prices.len() - 1);
        prop_assert_eq!(&simple.dates[..], &series.dates[1..]);
    }

    #[test]
    fn constant_prices_give_zero_returns(price in 0.01_f64..10_000.0, n in 2usize..100) {
        let series = PriceSeries::new(dates(n), vec![price; n], None).unwrap();
        prop_assert!(returns(&series).unwrap().values.iter().all(|r| *r == 0.0));
        prop_assert!(log_returns(&series).unwrap().values.iter().all(|r| *r == 0.0));
    }

    #[test]
    fn relative_returns_recover_price_ratio(prices in prices_strategy()) {
        let series = PriceSeries::new(dates(prices.len()), prices.clone(), None).unwrap();
        let relative = cumulative_relative_returns(&log_returns(&series).unwrap());
        let expected = prices[prices.len() - 1] / prices[0] - 1.0;
        let got = relative.last().unwrap();
        prop_assert!((got - expected).abs() <= 1e-8 * expected.abs().max(1.0));
    }

    #[test]
    fn unit_weight_selects_one_asset(
        rows in prop::collection::vec((0.01_f64..1_000.0, 0.01_f64..1_000.0), 2..100),
        pick in 0usize..2,
    ) {
        let n = rows.len();
        let flat: Vec<f64> = rows.iter().flat_map(|(a, b)| [*a, *b]).collect();
        let frame = PriceFrame::new(
            dates(n),
            vec!["A".into(), "B".into()],
            Array2::from_shape_vec((n, 2), flat).unwrap(),
        )
        .unwrap();

        let mut w = vec![0.0, 0.0];
        w[pick] = 1.0;
        let weights: Weights = w.into();

        let port = portfolio_returns(&weights, &frame).unwrap();
        let asset = log_returns(&frame.series(pick).unwrap()).unwrap();
        for (p, a) in port.values.iter().zip(&asset.values) {
            prop_assert!((p - a).abs() <= 1e-12);
        }
    }

    #[test]
    fn rolling_mean_point_count(values in prop::collection::vec(-100.0_f64..100.0, 0..100), window in 1usize..20) {
        let points = rolling_mean(&values, window).unwrap();
        prop_assert_eq!(points.len(), values.len().saturating_sub(window - 1));
        if let Some((idx, _)) = points.first() {
            prop_assert_eq!(*idx, window - 1);
        }
    }
}
