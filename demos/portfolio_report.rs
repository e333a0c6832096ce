use asset_returns::{
    cumulative_relative_returns, html, plot_returns, portfolio_returns, print_yearly_statistics,
    HtmlReportOptions, PlotOptions, PriceFrame, Weights, DEFAULT_DAYS_PER_YEAR,
};
use chrono::NaiveDate;
use ndarray::Array2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Two fake assets over roughly two trading years
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).expect("valid date");
    let days = 520;
    let mut dates = Vec::with_capacity(days);
    let mut prices = Array2::zeros((days, 2));
    let (mut a, mut b) = (100.0_f64, 50.0_f64);

    for i in 0..days {
        dates.push(start + chrono::Days::new(i as u64));
        let drift_a = match i % 5 {
            0 => 0.006,
            1 => -0.004,
            2 => 0.002,
            3 => 0.0,
            _ => 0.001,
        };
        let drift_b = if i % 3 == 0 { -0.003 } else { 0.0025 };
        a *= 1.0 + drift_a;
        b *= 1.0 + drift_b;
        prices[[i, 0]] = a;
        prices[[i, 1]] = b;
    }

    let frame = PriceFrame::new(dates, vec!["ALPHA".into(), "BETA".into()], prices)?;
    let weights: Weights = vec![0.7, 0.3].into();

    for (i, figure) in plot_returns(&frame, &PlotOptions::default())?
        .iter()
        .enumerate()
    {
        figure.save(format!("returns_{i}.svg"))?;
    }

    let port = portfolio_returns(&weights, &frame)?;
    let relative = cumulative_relative_returns(&port);
    print_yearly_statistics(&relative.values, DEFAULT_DAYS_PER_YEAR)?;

    let options = HtmlReportOptions::default()
        .with_title("Demo Portfolio")
        .with_output("portfolio.html");
    let page = html(&frame, &weights, options)?;

    println!("Generated HTML report ({} bytes) at portfolio.html", page.len());

    Ok(())
}
