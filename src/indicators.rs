use anyhow::{Result, anyhow};
use serde::Serialize;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, Maximum, Minimum, SimpleMovingAverage};

use crate::bars::Bar;

pub const EMA_FAST: usize = 10;
pub const EMA_MID: usize = 30;
pub const EMA_SLOW: usize = 40;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const RSI_PERIOD: usize = 14;
pub const VOLUME_MA_PERIOD: usize = 20;
pub const LEVELS_PERIOD: usize = 20;

/// Per-bar indicator values, index-aligned with the bars they were computed from.
///
/// EMAs and MACD are recursively seeded from the first bar and so exist from
/// index 0. The volume average and the 20-bar high/low use a minimum window of
/// one. RSI is `None` until `RSI_PERIOD` price deltas are available.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IndicatorSeries {
    pub ema10: Vec<f64>,
    pub ema30: Vec<f64>,
    pub ema40: Vec<f64>,
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub histogram: Vec<f64>,
    pub rsi: Vec<Option<f64>>,
    pub volume_ma20: Vec<f64>,
    pub high20: Vec<f64>,
    pub low20: Vec<f64>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.ema10.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ema10.is_empty()
    }
}

fn ema(span: usize) -> Result<ExponentialMovingAverage> {
    ExponentialMovingAverage::new(span).map_err(|e| anyhow!("invalid EMA span {span}: {e:?}"))
}

/// Fresh indicator state for one pass over a bar sequence.
///
/// Built once; `compute` clones the prototypes so repeated calls never share state.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    ema10: ExponentialMovingAverage,
    ema30: ExponentialMovingAverage,
    ema40: ExponentialMovingAverage,
    macd_fast: ExponentialMovingAverage,
    macd_slow: ExponentialMovingAverage,
    macd_signal: ExponentialMovingAverage,
    volume_ma: SimpleMovingAverage,
    high: Maximum,
    low: Minimum,
}

impl IndicatorEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ema10: ema(EMA_FAST)?,
            ema30: ema(EMA_MID)?,
            ema40: ema(EMA_SLOW)?,
            macd_fast: ema(MACD_FAST)?,
            macd_slow: ema(MACD_SLOW)?,
            macd_signal: ema(MACD_SIGNAL)?,
            volume_ma: SimpleMovingAverage::new(VOLUME_MA_PERIOD)
                .map_err(|e| anyhow!("invalid volume window: {e:?}"))?,
            high: Maximum::new(LEVELS_PERIOD).map_err(|e| anyhow!("invalid high window: {e:?}"))?,
            low: Minimum::new(LEVELS_PERIOD).map_err(|e| anyhow!("invalid low window: {e:?}"))?,
        })
    }

    /// Computes every series in one forward pass. Value `i` only ever sees bars `0..=i`.
    pub fn compute(&self, bars: &[Bar]) -> IndicatorSeries {
        let mut state = self.clone();
        let n = bars.len();
        let mut out = IndicatorSeries {
            ema10: Vec::with_capacity(n),
            ema30: Vec::with_capacity(n),
            ema40: Vec::with_capacity(n),
            dif: Vec::with_capacity(n),
            dea: Vec::with_capacity(n),
            histogram: Vec::with_capacity(n),
            rsi: Vec::with_capacity(n),
            volume_ma20: Vec::with_capacity(n),
            high20: Vec::with_capacity(n),
            low20: Vec::with_capacity(n),
        };

        for bar in bars {
            let price = bar.calc_price();
            out.ema10.push(state.ema10.next(price));
            out.ema30.push(state.ema30.next(price));
            out.ema40.push(state.ema40.next(price));

            let dif = state.macd_fast.next(price) - state.macd_slow.next(price);
            let dea = state.macd_signal.next(dif);
            out.dif.push(dif);
            out.dea.push(dea);
            out.histogram.push(dif - dea);

            out.volume_ma20.push(state.volume_ma.next(bar.volume));
            out.high20.push(state.high.next(bar.high));
            out.low20.push(state.low.next(bar.low));
        }

        let prices: Vec<f64> = bars.iter().map(Bar::calc_price).collect();
        out.rsi = rolling_rsi(&prices, RSI_PERIOD);
        out
    }
}

/// RSI from a simple rolling mean of gains and losses over the trailing
/// `period` deltas (not Wilder smoothing). `None` until `period` deltas exist.
pub fn rolling_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    (0..prices.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            // Deltas ending at price i are deltas[i - period..i].
            let window = &deltas[i - period..i];
            let gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
            let loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
            Some(rsi_from_averages(gain, loss))
        })
        .collect()
}

/// Zero average loss maps to 100 (only gains) or 50 (no movement).
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
