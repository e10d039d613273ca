//! MACD, RSI and volume readings.

use serde::Serialize;

use super::Snapshot;

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const HIGH_VOLUME_RATIO: f64 = 1.5;
pub const LOW_VOLUME_RATIO: f64 = 0.7;

/// Bars back the histogram is compared against.
const HISTOGRAM_LOOKBACK: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramTrend {
    Rising,
    Falling,
    /// Too few bars to compare; only the sign of the current value is known.
    Positive,
    Negative,
}

impl HistogramTrend {
    pub fn label(&self) -> &'static str {
        match self {
            HistogramTrend::Rising => "rising",
            HistogramTrend::Falling => "falling/converging",
            HistogramTrend::Positive => "positive (single-bar reading)",
            HistogramTrend::Negative => "negative (single-bar reading)",
        }
    }

    pub fn is_strengthening(&self) -> bool {
        matches!(self, HistogramTrend::Rising | HistogramTrend::Positive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    Golden,
    Death,
}

impl Crossover {
    pub fn label(&self) -> &'static str {
        match self {
            Crossover::Golden => "golden cross",
            Crossover::Death => "death cross",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
    Unavailable,
}

impl RsiZone {
    pub fn from_value(rsi: Option<f64>) -> Self {
        match rsi {
            Some(v) if v > RSI_OVERBOUGHT => RsiZone::Overbought,
            Some(v) if v < RSI_OVERSOLD => RsiZone::Oversold,
            Some(_) => RsiZone::Neutral,
            None => RsiZone::Unavailable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RsiZone::Overbought => "overbought",
            RsiZone::Oversold => "oversold",
            RsiZone::Neutral => "neutral",
            RsiZone::Unavailable => "not yet available",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeLevel {
    High,
    Low,
    Normal,
}

impl VolumeLevel {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > HIGH_VOLUME_RATIO {
            VolumeLevel::High
        } else if ratio < LOW_VOLUME_RATIO {
            VolumeLevel::Low
        } else {
            VolumeLevel::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VolumeLevel::High => "high volume",
            VolumeLevel::Low => "low volume",
            VolumeLevel::Normal => "normal volume",
        }
    }
}

/// Volume relative to its average; 1.0 when the average is zero.
pub fn volume_ratio(volume: f64, average: f64) -> f64 {
    if average > 0.0 { volume / average } else { 1.0 }
}

pub fn histogram_trend(histogram: &[f64]) -> HistogramTrend {
    let n = histogram.len();
    let Some(&current) = histogram.last() else {
        return HistogramTrend::Negative;
    };

    if n <= HISTOGRAM_LOOKBACK {
        return if current >= 0.0 {
            HistogramTrend::Positive
        } else {
            HistogramTrend::Negative
        };
    }

    if current > histogram[n - 1 - HISTOGRAM_LOOKBACK] {
        HistogramTrend::Rising
    } else {
        HistogramTrend::Falling
    }
}

/// Sign flip of DIF - DEA between the last two bars. Needs at least three bars.
pub fn crossover(dif: &[f64], dea: &[f64]) -> Option<Crossover> {
    let n = dif.len().min(dea.len());
    if n <= HISTOGRAM_LOOKBACK {
        return None;
    }
    let prev = dif[n - 2] - dea[n - 2];
    let curr = dif[n - 1] - dea[n - 1];

    if prev <= 0.0 && curr > 0.0 {
        Some(Crossover::Golden)
    } else if prev >= 0.0 && curr < 0.0 {
        Some(Crossover::Death)
    } else {
        None
    }
}

pub fn macd_text(snap: &Snapshot) -> String {
    let cross = match snap.crossover {
        Some(Crossover::Golden) => " DIF just crossed above DEA (golden cross).",
        Some(Crossover::Death) => " DIF just crossed below DEA (death cross).",
        None => "",
    };
    format!(
        "MACD: DIF {:.3}, DEA {:.3}, histogram {:.3} ({}).{}",
        snap.dif,
        snap.dea,
        snap.histogram,
        snap.histogram_trend.label(),
        cross
    )
}

pub fn rsi_text(snap: &Snapshot) -> String {
    match (snap.rsi, snap.rsi_zone) {
        (Some(v), RsiZone::Overbought) => {
            format!("RSI(14) {v:.1}: overbought, upside may be stretched in the short term.")
        }
        (Some(v), RsiZone::Oversold) => {
            format!("RSI(14) {v:.1}: oversold, a technical rebound is possible.")
        }
        (Some(v), _) => format!("RSI(14) {v:.1}: neutral zone."),
        (None, _) => "RSI(14): not yet available (needs 15 bars).".to_string(),
    }
}

pub fn volume_note(snap: &Snapshot) -> String {
    let detail = match snap.volume_level {
        VolumeLevel::High => "participation is heavy; the move carries conviction",
        VolumeLevel::Low => "participation is thin; moves are less reliable",
        VolumeLevel::Normal => "participation is in line with recent sessions",
    };
    format!(
        "Volume {:.0} vs 20-day average {:.0} ({:.2}x, {}): {}.",
        snap.volume,
        snap.volume_avg,
        snap.volume_ratio,
        snap.volume_level.label(),
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::testing::snapshot;

    #[test]
    fn rsi_zone_thresholds() {
        assert_eq!(RsiZone::from_value(Some(70.1)), RsiZone::Overbought);
        assert_eq!(RsiZone::from_value(Some(70.0)), RsiZone::Neutral);
        assert_eq!(RsiZone::from_value(Some(29.9)), RsiZone::Oversold);
        assert_eq!(RsiZone::from_value(None), RsiZone::Unavailable);
    }

    #[test]
    fn volume_level_thresholds() {
        assert_eq!(VolumeLevel::from_ratio(1.6), VolumeLevel::High);
        assert_eq!(VolumeLevel::from_ratio(1.5), VolumeLevel::Normal);
        assert_eq!(VolumeLevel::from_ratio(0.69), VolumeLevel::Low);
        assert_eq!(volume_ratio(500.0, 0.0), 1.0);
        assert_eq!(volume_ratio(300.0, 200.0), 1.5);
    }

    #[test]
    fn histogram_compares_two_bars_back() {
        assert_eq!(histogram_trend(&[0.5, 0.1, 0.2, 0.3]), HistogramTrend::Rising);
        assert_eq!(histogram_trend(&[0.0, 0.4, 0.1, 0.3]), HistogramTrend::Falling);
    }

    #[test]
    fn short_history_uses_sign_only() {
        assert_eq!(histogram_trend(&[0.1, -0.2]), HistogramTrend::Negative);
        assert_eq!(histogram_trend(&[0.3]), HistogramTrend::Positive);
        assert_eq!(crossover(&[-1.0, 1.0], &[0.0, 0.0]), None);
    }

    #[test]
    fn crossovers_detected_on_sign_flip() {
        let dea = [0.0, 0.0, 0.0];
        assert_eq!(crossover(&[0.0, -0.1, 0.2], &dea), Some(Crossover::Golden));
        assert_eq!(crossover(&[0.0, 0.1, -0.2], &dea), Some(Crossover::Death));
        assert_eq!(crossover(&[0.0, 0.1, 0.2], &dea), None);
        assert_eq!(crossover(&[0.0, 0.0, 0.0], &dea), None);
    }

    #[test]
    fn texts_mention_readings() {
        let mut snap = snapshot();
        snap.crossover = Some(Crossover::Golden);
        assert!(macd_text(&snap).contains("golden cross"));

        snap.rsi = None;
        snap.rsi_zone = RsiZone::Unavailable;
        assert!(rsi_text(&snap).contains("not yet available"));

        snap.volume = 2_000_000.0;
        snap.volume_ratio = 2.0;
        snap.volume_level = VolumeLevel::High;
        assert!(volume_note(&snap).contains("2.00x, high volume"));
    }
}
