//! Daily OHLCV bars and the request parameters used to fetch them.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One trading session. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Split/dividend adjusted close. Not every source supplies it.
    pub adjusted_close: Option<f64>,
    pub volume: f64,
}

impl Bar {
    /// Price the indicators run on: adjusted close when present, close otherwise.
    pub fn calc_price(&self) -> f64 {
        self.adjusted_close.unwrap_or(self.close)
    }
}

/// Lookback window offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum Period {
    #[serde(rename = "1mo")]
    #[value(name = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    #[value(name = "3mo")]
    ThreeMonths,
    #[default]
    #[serde(rename = "6mo")]
    #[value(name = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    #[value(name = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    #[value(name = "2y")]
    TwoYears,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling interval. Reports are only ever built from daily bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_price_prefers_adjusted_close() {
        let mut bar = fixtures::bars_from_closes(&[10.0]).remove(0);
        assert_eq!(bar.calc_price(), 10.0);
        bar.adjusted_close = Some(9.5);
        assert_eq!(bar.calc_price(), 9.5);
    }

    #[test]
    fn period_serializes_as_range_string() {
        let json = serde_json::to_string(&Period::OneYear).unwrap();
        assert_eq!(json, "\"1y\"");
        let back: Period = serde_json::from_str("\"3mo\"").unwrap();
        assert_eq!(back, Period::ThreeMonths);
        assert_eq!(Period::default().as_str(), "6mo");
    }
}
