use serde::Serialize;

use crate::indicators::IndicatorSeries;

use super::Snapshot;

/// Bars between the two EMA samples used for slope.
pub const SLOPE_LOOKBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Mixed,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Bullish => "bullish/aligned-upward",
            Trend::Bearish => "bearish/aligned-downward",
            Trend::Mixed => "mixed/consolidating",
        }
    }
}

/// Where the calculation price sits relative to the three EMAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePosition {
    AboveAll,
    BelowAll,
    Between,
}

impl PricePosition {
    pub fn of(price: f64, ema10: f64, ema30: f64, ema40: f64) -> Self {
        if price > ema10 && price > ema30 && price > ema40 {
            PricePosition::AboveAll
        } else if price < ema10 && price < ema30 && price < ema40 {
            PricePosition::BelowAll
        } else {
            PricePosition::Between
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PricePosition::AboveAll => "above EMA10/30/40",
            PricePosition::BelowAll => "below EMA10/30/40",
            PricePosition::Between => "between the EMAs",
        }
    }
}

/// Change of `values` over the last `SLOPE_LOOKBACK` bars, measured from bar 0
/// when the series is shorter than that.
pub fn slope(values: &[f64]) -> f64 {
    let Some(&last) = values.last() else {
        return 0.0;
    };
    let from = values.len().saturating_sub(SLOPE_LOOKBACK + 1);
    last - values[from]
}

pub fn classify_trend(series: &IndicatorSeries) -> Trend {
    let (Some(&e10), Some(&e30), Some(&e40)) =
        (series.ema10.last(), series.ema30.last(), series.ema40.last())
    else {
        return Trend::Mixed;
    };
    let slope10 = slope(&series.ema10);
    let slope30 = slope(&series.ema30);

    if e10 > e30 && e30 > e40 && slope10 > 0.0 && slope30 > 0.0 {
        Trend::Bullish
    } else if e10 < e30 && e30 < e40 && slope10 < 0.0 {
        Trend::Bearish
    } else {
        Trend::Mixed
    }
}

pub fn trend_text(snap: &Snapshot) -> String {
    let detail = match snap.trend {
        Trend::Bullish => "EMA10 > EMA30 > EMA40 with both short averages rising; the uptrend structure is intact",
        Trend::Bearish => "EMA10 < EMA30 < EMA40 with EMA10 still falling; sellers control the trend",
        Trend::Mixed => "the averages are interleaved or flattening; direction is unresolved",
    };
    format!(
        "Trend: {} ({}). Price {:.2} is {}.",
        snap.trend.label(),
        detail,
        snap.price,
        snap.position.label()
    )
}
