//! Single-candle shape classification.

use serde::Serialize;
use std::fmt;

use crate::bars::Bar;

const RANGE_EPSILON: f64 = 1e-9;
const DOJI_BODY_RATIO: f64 = 0.15;
const LONG_BODY_RATIO: f64 = 0.7;
const WICK_TO_BODY: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyShape {
    Doji,
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WickShape {
    LongLowerWick,
    LongUpperWick,
    LongBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeLabel {
    pub body: BodyShape,
    pub wick: Option<WickShape>,
}

impl BodyShape {
    pub fn label(&self) -> &'static str {
        match self {
            BodyShape::Doji => "doji/small-body",
            BodyShape::Bullish => "bullish",
            BodyShape::Bearish => "bearish",
        }
    }

    pub fn meaning(&self) -> &'static str {
        match self {
            BodyShape::Doji => "consolidation",
            BodyShape::Bullish => "buyers in control",
            BodyShape::Bearish => "sellers in control",
        }
    }
}

impl WickShape {
    pub fn label(&self) -> &'static str {
        match self {
            WickShape::LongLowerWick => "long lower wick",
            WickShape::LongUpperWick => "long upper wick",
            WickShape::LongBody => "long body",
        }
    }

    pub fn meaning(&self) -> &'static str {
        match self {
            WickShape::LongLowerWick => "support/accumulation below",
            WickShape::LongUpperWick => "resistance/profit-taking above",
            WickShape::LongBody => "strong directional move",
        }
    }
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.body.label())?;
        if let Some(wick) = self.wick {
            write!(f, ", {}", wick.label())?;
        }
        Ok(())
    }
}

impl ShapeLabel {
    /// Label plus what it usually signals, e.g. "bullish, long lower wick (buyers in control; support/accumulation below)".
    pub fn describe(&self) -> String {
        match self.wick {
            Some(wick) => format!("{} ({}; {})", self, self.body.meaning(), wick.meaning()),
            None => format!("{} ({})", self, self.body.meaning()),
        }
    }
}

/// Classifies one candle from its OHLC.
///
/// A zero-length body never receives a wick suffix: with `body == 0` both
/// wick tests would pass on any non-zero wick, so the bar stays a plain doji.
pub fn classify(open: f64, high: f64, low: f64, close: f64) -> ShapeLabel {
    let body = (close - open).abs();
    let range = high - low;
    let body_ratio = body / (range + RANGE_EPSILON);

    let body_shape = if body_ratio < DOJI_BODY_RATIO {
        BodyShape::Doji
    } else if close > open {
        BodyShape::Bullish
    } else {
        BodyShape::Bearish
    };

    let lower_wick = close.min(open) - low;
    let upper_wick = high - close.max(open);

    let wick = if body == 0.0 {
        None
    } else if lower_wick > WICK_TO_BODY * body && lower_wick > upper_wick {
        Some(WickShape::LongLowerWick)
    } else if upper_wick > WICK_TO_BODY * body && upper_wick > lower_wick {
        Some(WickShape::LongUpperWick)
    } else if body_ratio > LONG_BODY_RATIO {
        Some(WickShape::LongBody)
    } else {
        None
    };

    ShapeLabel {
        body: body_shape,
        wick,
    }
}

pub fn classify_bar(bar: &Bar) -> ShapeLabel {
    classify(bar.open, bar.high, bar.low, bar.close)
}
