use serde::Serialize;

use super::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyLevels {
    pub close: f64,
    pub ema10: f64,
    pub ema30: f64,
    pub ema40: f64,
    pub high20: f64,
    pub low20: f64,
}

impl KeyLevels {
    pub fn from_snapshot(snap: &Snapshot) -> Self {
        Self {
            close: snap.price,
            ema10: snap.ema10,
            ema30: snap.ema30,
            ema40: snap.ema40,
            high20: snap.high20,
            low20: snap.low20,
        }
    }

    /// Nearest EMA under the close, if any.
    pub fn nearest_support(&self) -> Option<f64> {
        [self.ema10, self.ema30, self.ema40]
            .into_iter()
            .filter(|&v| v < self.close)
            .max_by(f64::total_cmp)
    }

    /// Nearest EMA above the close, if any.
    pub fn nearest_resistance(&self) -> Option<f64> {
        [self.ema10, self.ema30, self.ema40]
            .into_iter()
            .filter(|&v| v > self.close)
            .min_by(f64::total_cmp)
    }
}

pub fn levels_text(levels: &KeyLevels) -> String {
    let mut text = format!(
        "EMA10 {:.2}, EMA30 {:.2}, EMA40 {:.2}; 20-day high {:.2}, 20-day low {:.2}.",
        levels.ema10, levels.ema30, levels.ema40, levels.high20, levels.low20
    );
    if let Some(support) = levels.nearest_support() {
        text.push_str(&format!(" Nearest moving-average support {support:.2}."));
    }
    if let Some(resistance) = levels.nearest_resistance() {
        text.push_str(&format!(" Nearest moving-average resistance {resistance:.2}."));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::testing::snapshot;

    #[test]
    fn support_and_resistance_bracket_close() {
        let mut snap = snapshot();
        snap.price = 101.0;
        snap.ema10 = 102.0;
        snap.ema30 = 100.5;
        snap.ema40 = 99.0;
        let levels = KeyLevels::from_snapshot(&snap);

        assert_eq!(levels.nearest_support(), Some(100.5));
        assert_eq!(levels.nearest_resistance(), Some(102.0));

        let text = levels_text(&levels);
        assert!(text.contains("20-day high 110.00"));
        assert!(text.contains("support 100.50"));
        assert!(text.contains("resistance 102.00"));
    }

    #[test]
    fn no_support_when_below_all_averages() {
        let mut snap = snapshot();
        snap.price = 90.0;
        let levels = KeyLevels::from_snapshot(&snap);
        assert_eq!(levels.nearest_support(), None);
        assert!(!levels_text(&levels).contains("support"));
    }
}
