//! Rule-based interpretation of the latest indicator state.
//!
//! Every block is a pure function of a [`Snapshot`] (or of the bar and
//! indicator arrays); no block reads another block's text.

pub mod advice;
pub mod history;
pub mod levels;
pub mod momentum;
pub mod per_bar;
pub mod scenarios;
pub mod trend;

use chrono::NaiveDate;
use serde::Serialize;

use crate::bars::Bar;
use crate::indicators::IndicatorSeries;

use momentum::{Crossover, HistogramTrend, RsiZone, VolumeLevel};
use trend::{PricePosition, Trend};

/// A (predicate, template) pair. Tables of rules are evaluated top to bottom.
pub struct Rule<C> {
    pub name: &'static str,
    pub when: fn(&C) -> bool,
    pub render: fn(&C) -> String,
}

/// First rule in `rules` whose predicate holds.
pub fn first_match<'a, C>(rules: &'a [Rule<C>], ctx: &C) -> Option<&'a Rule<C>> {
    rules.iter().find(|rule| (rule.when)(ctx))
}

/// Indicator state at the last bar, shared by every narrative block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub bar_count: usize,
    pub price: f64,
    pub volume: f64,
    pub ema10: f64,
    pub ema30: f64,
    pub ema40: f64,
    pub dif: f64,
    pub dea: f64,
    pub histogram: f64,
    pub histogram_trend: HistogramTrend,
    pub crossover: Option<Crossover>,
    pub rsi: Option<f64>,
    pub rsi_zone: RsiZone,
    pub volume_avg: f64,
    pub volume_ratio: f64,
    pub volume_level: VolumeLevel,
    pub high20: f64,
    pub low20: f64,
    pub trend: Trend,
    pub position: PricePosition,
}

impl Snapshot {
    /// Snapshot of the final bar. `None` for an empty sequence.
    pub fn latest(bars: &[Bar], series: &IndicatorSeries) -> Option<Self> {
        let last = bars.len().checked_sub(1)?;
        let bar = &bars[last];
        let price = bar.calc_price();
        let rsi = series.rsi[last];
        let volume_ratio = momentum::volume_ratio(bar.volume, series.volume_ma20[last]);

        Some(Self {
            date: bar.date,
            bar_count: bars.len(),
            price,
            volume: bar.volume,
            ema10: series.ema10[last],
            ema30: series.ema30[last],
            ema40: series.ema40[last],
            dif: series.dif[last],
            dea: series.dea[last],
            histogram: series.histogram[last],
            histogram_trend: momentum::histogram_trend(&series.histogram),
            crossover: momentum::crossover(&series.dif, &series.dea),
            rsi,
            rsi_zone: RsiZone::from_value(rsi),
            volume_avg: series.volume_ma20[last],
            volume_ratio,
            volume_level: VolumeLevel::from_ratio(volume_ratio),
            high20: series.high20[last],
            low20: series.low20[last],
            trend: trend::classify_trend(series),
            position: PricePosition::of(price, series.ema10[last], series.ema30[last], series.ema40[last]),
        })
    }

    /// RSI below the overbought line, treating a warming-up RSI as not overbought.
    pub fn rsi_below(&self, level: f64) -> bool {
        self.rsi.is_none_or(|r| r < level)
    }

    pub fn rsi_above(&self, level: f64) -> bool {
        self.rsi.is_some_and(|r| r > level)
    }
}

/// One-line verdict built from trend, MACD and RSI.
pub fn quick_summary(snap: &Snapshot) -> String {
    let cross = match snap.crossover {
        Some(c) => format!(", {}", c.label()),
        None => String::new(),
    };
    format!(
        "Trend {}; price {}; MACD histogram {}{}; RSI {}.",
        snap.trend.label(),
        snap.position.label(),
        snap.histogram_trend.label(),
        cross,
        snap.rsi_zone.label(),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A neutral snapshot that tests tweak field by field.
    pub fn snapshot() -> Snapshot {
        Snapshot {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            bar_count: 120,
            price: 100.0,
            volume: 1_000_000.0,
            ema10: 100.0,
            ema30: 100.0,
            ema40: 100.0,
            dif: 0.0,
            dea: 0.0,
            histogram: 0.0,
            histogram_trend: HistogramTrend::Falling,
            crossover: None,
            rsi: Some(50.0),
            rsi_zone: RsiZone::Neutral,
            volume_avg: 1_000_000.0,
            volume_ratio: 1.0,
            volume_level: VolumeLevel::Normal,
            high20: 110.0,
            low20: 90.0,
            trend: Trend::Mixed,
            position: PricePosition::Between,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::fixtures::rising;
    use crate::indicators::IndicatorEngine;

    #[test]
    fn latest_snapshot_on_rising_series() {
        let bars = rising(25);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        let snap = Snapshot::latest(&bars, &series).unwrap();

        assert_eq!(snap.bar_count, 25);
        assert_eq!(snap.trend, Trend::Bullish);
        assert_eq!(snap.position, PricePosition::AboveAll);
        assert_eq!(snap.rsi_zone, RsiZone::Overbought);
        assert_eq!(snap.volume_level, VolumeLevel::Normal);
        assert!(quick_summary(&snap).starts_with("Trend bullish/aligned-upward"));
    }

    #[test]
    fn no_snapshot_without_bars() {
        let series = IndicatorSeries::default();
        assert!(Snapshot::latest(&[], &series).is_none());
    }

    #[test]
    fn first_match_respects_order() {
        let rules: [Rule<i32>; 2] = [
            Rule {
                name: "positive",
                when: |v| *v > 0,
                render: |_| "positive".to_string(),
            },
            Rule {
                name: "large",
                when: |v| *v > 10,
                render: |_| "large".to_string(),
            },
        ];
        assert_eq!(first_match(&rules, &20).map(|r| r.name), Some("positive"));
        assert!(first_match(&rules, &-1).is_none());
    }
}
