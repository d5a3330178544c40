//! Summary statistics over a replayed portfolio.

use super::portfolio::{PortfolioValueSeries, Side, ValuePoint};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_cash: f64,
    pub final_value: f64,
    /// (final - initial) / initial; 0 when initial cash is 0.
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of points spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub total_fills: usize,
    pub round_trips: usize,
    pub winning_round_trips: usize,
    /// Share of points spent holding the asset.
    pub exposure: f64,
    pub non_finite_points: usize,
}

impl Metrics {
    pub fn compute(portfolio: &PortfolioValueSeries) -> Self {
        let initial_cash = portfolio.initial_cash;
        let final_value = portfolio.final_value().unwrap_or(initial_cash);

        let total_return = if initial_cash > 0.0 {
            (final_value - initial_cash) / initial_cash
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&portfolio.points);
        let (round_trips, winning_round_trips) = count_round_trips(portfolio);

        let invested = portfolio
            .points
            .iter()
            .filter(|p| p.position_units > 0.0)
            .count();
        let exposure = if portfolio.points.is_empty() {
            0.0
        } else {
            invested as f64 / portfolio.points.len() as f64
        };

        let non_finite_points = portfolio
            .points
            .iter()
            .filter(|p| !p.value.is_finite())
            .count();

        Metrics {
            initial_cash,
            final_value,
            total_return,
            max_drawdown,
            max_drawdown_duration,
            total_fills: portfolio.fills.len(),
            round_trips,
            winning_round_trips,
            exposure,
            non_finite_points,
        }
    }

    pub fn total_return_pct(&self) -> f64 {
        self.total_return * 100.0
    }

    pub fn win_rate(&self) -> f64 {
        if self.round_trips > 0 {
            self.winning_round_trips as f64 / self.round_trips as f64
        } else {
            0.0
        }
    }
}

fn compute_drawdown(points: &[ValuePoint]) -> (f64, usize) {
    let mut finite = points.iter().map(|p| p.value).filter(|v| v.is_finite());
    let Some(mut peak) = finite.next() else {
        return (0.0, 0);
    };

    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for value in finite {
        if value >= peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

/// Pairs each buy with the following sell. A trailing open buy is not a
/// round trip.
fn count_round_trips(portfolio: &PortfolioValueSeries) -> (usize, usize) {
    let mut trips = 0;
    let mut winners = 0;
    let mut entry_notional: Option<f64> = None;

    for fill in &portfolio.fills {
        match fill.side {
            Side::Buy => entry_notional = Some(fill.notional),
            Side::Sell => {
                if let Some(spent) = entry_notional.take() {
                    trips += 1;
                    if fill.notional > spent {
                        winners += 1;
                    }
                }
            }
        }
    }

    (trips, winners)
}
