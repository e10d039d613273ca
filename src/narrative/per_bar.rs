use chrono::NaiveDate;

use crate::bars::Bar;
use crate::candle::{ShapeLabel, classify_bar};
use crate::indicators::IndicatorSeries;

use super::momentum::{RsiZone, VolumeLevel, volume_ratio};

pub const RECENT_BARS: usize = 5;

/// Everything the per-bar sentence needs about one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarReading {
    pub date: NaiveDate,
    pub shape: ShapeLabel,
    pub price: f64,
    pub ema10: f64,
    pub volume_ratio: f64,
    pub volume_level: VolumeLevel,
    pub rsi: Option<f64>,
    pub rsi_zone: RsiZone,
}

pub fn bar_reading(bars: &[Bar], series: &IndicatorSeries, i: usize) -> BarReading {
    let bar = &bars[i];
    let ratio = volume_ratio(bar.volume, series.volume_ma20[i]);
    BarReading {
        date: bar.date,
        shape: classify_bar(bar),
        price: bar.calc_price(),
        ema10: series.ema10[i],
        volume_ratio: ratio,
        volume_level: VolumeLevel::from_ratio(ratio),
        rsi: series.rsi[i],
        rsi_zone: RsiZone::from_value(series.rsi[i]),
    }
}

/// Readings for the trailing `RECENT_BARS` bars, oldest first.
pub fn recent_readings(bars: &[Bar], series: &IndicatorSeries) -> Vec<BarReading> {
    let start = bars.len().saturating_sub(RECENT_BARS);
    (start..bars.len())
        .map(|i| bar_reading(bars, series, i))
        .collect()
}

pub fn interpret(reading: &BarReading) -> String {
    let side = if reading.price > reading.ema10 {
        "above"
    } else if reading.price < reading.ema10 {
        "below"
    } else {
        "at"
    };
    let rsi = match reading.rsi {
        Some(v) => format!("RSI {v:.1} ({})", reading.rsi_zone.label()),
        None => "RSI n/a".to_string(),
    };
    format!(
        "{}; close {} EMA10 {:.2}; volume {:.2}x average ({}); {}.",
        reading.shape.describe(),
        side,
        reading.ema10,
        reading.volume_ratio,
        reading.volume_level.label(),
        rsi
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::fixtures::{day, rising};
    use crate::indicators::IndicatorEngine;

    #[test]
    fn takes_last_five_oldest_first() {
        let bars = rising(8);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        let readings = recent_readings(&bars, &series);
        let dates: Vec<_> = readings.iter().map(|r| r.date).collect();
        assert_eq!(dates, (3..8).map(day).collect::<Vec<_>>());
    }

    #[test]
    fn short_sequences_yield_fewer_rows() {
        let bars = rising(2);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        assert_eq!(recent_readings(&bars, &series).len(), 2);
    }

    #[test]
    fn sentence_combines_all_readings() {
        let mut bars = rising(20);
        bars[19].volume = 3_000_000.0;
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        let text = interpret(&bar_reading(&bars, &series, 19));

        assert!(text.starts_with("bullish"));
        assert!(text.contains("close above EMA10"));
        assert!(text.contains("(high volume)"));
        assert!(text.contains("RSI 100.0 (overbought)"));
    }

    #[test]
    fn warm_up_rsi_is_marked() {
        let bars = rising(3);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        assert!(interpret(&bar_reading(&bars, &series, 2)).ends_with("RSI n/a."));
    }
}
