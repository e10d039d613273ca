//! Forward scenarios. Each block has its own rule table and fires on its
//! first matching rule; blocks are independent, so all three may appear.

use serde::Serialize;

use super::momentum::{HIGH_VOLUME_RATIO, HistogramTrend, LOW_VOLUME_RATIO, RSI_OVERBOUGHT, RSI_OVERSOLD};
use super::{Rule, Snapshot, first_match};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Optimistic,
    Pessimistic,
    Neutral,
}

impl ScenarioKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::Optimistic => "Optimistic",
            ScenarioKind::Pessimistic => "Pessimistic",
            ScenarioKind::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub rule: &'static str,
    pub text: String,
}

/// Price within this fraction of EMA10 counts as hugging the average.
const HUG_BAND: f64 = 0.01;

fn hugging_ema10(s: &Snapshot) -> bool {
    s.ema10 != 0.0 && ((s.price - s.ema10) / s.ema10).abs() < HUG_BAND
}

pub static OPTIMISTIC: &[Rule<Snapshot>] = &[
    Rule {
        name: "volume_backed_breakout",
        when: |s| {
            s.price > s.ema10
                && s.histogram_trend.is_strengthening()
                && s.volume_ratio > 1.0
                && s.rsi_below(RSI_OVERBOUGHT)
        },
        render: |s| {
            format!(
                "Holding above EMA10 {:.2} on above-average volume with MACD momentum building could carry price toward the 20-day high {:.2}.",
                s.ema10, s.high20
            )
        },
    },
    Rule {
        name: "above_ema30_momentum",
        when: |s| s.price > s.ema30 && s.histogram_trend.is_strengthening(),
        render: |s| {
            format!(
                "While price stays above EMA30 {:.2} and the histogram keeps rising, a retest of {:.2} is plausible.",
                s.ema30, s.high20
            )
        },
    },
    Rule {
        name: "oversold_rebound",
        when: |s| s.rsi.is_some_and(|r| r < RSI_OVERSOLD),
        render: |s| {
            format!(
                "RSI is oversold; a reflex rebound toward EMA10 {:.2} can come quickly if selling dries up.",
                s.ema10
            )
        },
    },
];

pub static PESSIMISTIC: &[Rule<Snapshot>] = &[
    Rule {
        name: "heavy_volume_breakdown",
        when: |s| {
            s.price < s.ema30
                && s.histogram_trend == HistogramTrend::Falling
                && s.volume_ratio > HIGH_VOLUME_RATIO
        },
        render: |s| {
            format!(
                "A heavy-volume break below EMA30 {:.2} with fading momentum opens the way to the 20-day low {:.2}.",
                s.ema30, s.low20
            )
        },
    },
    Rule {
        name: "overbought_pullback",
        when: |s| s.rsi_above(RSI_OVERBOUGHT),
        render: |s| {
            format!(
                "RSI is overbought; a pullback to EMA10 {:.2} would be a normal reset.",
                s.ema10
            )
        },
    },
    Rule {
        name: "lost_ema10",
        when: |s| {
            s.price < s.ema10
                && matches!(s.histogram_trend, HistogramTrend::Falling | HistogramTrend::Negative)
        },
        render: |s| {
            format!(
                "Losing EMA10 with weakening MACD could pull price back to EMA30 {:.2}, then EMA40 {:.2}.",
                s.ema30, s.ema40
            )
        },
    },
];

pub static NEUTRAL: &[Rule<Snapshot>] = &[
    Rule {
        name: "thin_volume_range",
        when: |s| s.volume_ratio < LOW_VOLUME_RATIO,
        render: |s| {
            format!(
                "Thin volume favours range trading between {:.2} and {:.2} until a catalyst arrives.",
                s.low20, s.high20
            )
        },
    },
    Rule {
        name: "hugging_ema10",
        when: |s| hugging_ema10(s) && s.rsi.is_none_or(|r| (40.0..=60.0).contains(&r)),
        render: |s| {
            format!(
                "Price is hugging EMA10 {:.2} with a mid-range RSI; expect consolidation before the next leg.",
                s.ema10
            )
        },
    },
];

fn evaluate(kind: ScenarioKind, rules: &[Rule<Snapshot>], snap: &Snapshot) -> Option<Scenario> {
    first_match(rules, snap).map(|rule| Scenario {
        kind,
        rule: rule.name,
        text: (rule.render)(snap),
    })
}

/// Every block that fires, in optimistic, pessimistic, neutral order.
pub fn forward_scenarios(snap: &Snapshot) -> Vec<Scenario> {
    [
        (ScenarioKind::Optimistic, OPTIMISTIC),
        (ScenarioKind::Pessimistic, PESSIMISTIC),
        (ScenarioKind::Neutral, NEUTRAL),
    ]
    .into_iter()
    .filter_map(|(kind, rules)| evaluate(kind, rules, snap))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::momentum::{RsiZone, VolumeLevel};
    use crate::narrative::testing::snapshot;

    fn rules_fired(snap: &Snapshot) -> Vec<&'static str> {
        forward_scenarios(snap).into_iter().map(|s| s.rule).collect()
    }

    #[test]
    fn breakout_beats_weaker_optimistic_rules() {
        let mut snap = snapshot();
        snap.price = 103.0;
        snap.histogram_trend = HistogramTrend::Rising;
        snap.volume_ratio = 1.2;
        assert_eq!(rules_fired(&snap), vec!["volume_backed_breakout"]);

        snap.volume_ratio = 0.9;
        assert_eq!(rules_fired(&snap), vec!["above_ema30_momentum"]);
    }

    #[test]
    fn all_three_blocks_can_fire_together() {
        let mut snap = snapshot();
        snap.price = 100.5;
        snap.ema10 = 100.0;
        snap.ema30 = 99.0;
        snap.histogram_trend = HistogramTrend::Rising;
        snap.rsi = Some(75.0);
        snap.rsi_zone = RsiZone::Overbought;
        snap.volume_ratio = 0.5;
        snap.volume_level = VolumeLevel::Low;

        let kinds: Vec<_> = forward_scenarios(&snap).into_iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ScenarioKind::Optimistic, ScenarioKind::Pessimistic, ScenarioKind::Neutral]
        );
        assert_eq!(
            rules_fired(&snap),
            vec!["above_ema30_momentum", "overbought_pullback", "thin_volume_range"]
        );
    }

    #[test]
    fn breakdown_rule_has_priority() {
        let mut snap = snapshot();
        snap.price = 95.0;
        snap.histogram_trend = HistogramTrend::Falling;
        snap.volume_ratio = 2.0;
        let fired = forward_scenarios(&snap);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].rule, "heavy_volume_breakdown");
        assert!(fired[0].text.contains("20-day low 90.00"));
    }

    #[test]
    fn quiet_market_is_neutral_only() {
        let snap = snapshot();
        assert_eq!(rules_fired(&snap), vec!["hugging_ema10"]);
    }
}
