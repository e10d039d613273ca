//! Positioning notes for three kinds of reader. Each table ends in a
//! catch-all so every audience always gets a line.

use serde::Serialize;

use super::momentum::{Crossover, RSI_OVERBOUGHT, RsiZone};
use super::trend::{PricePosition, Trend};
use super::{Rule, Snapshot, first_match};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Holders,
    NewLongs,
    ShortTerm,
}

impl Audience {
    pub fn label(&self) -> &'static str {
        match self {
            Audience::Holders => "Holders",
            Audience::NewLongs => "New longs",
            Audience::ShortTerm => "Short-term",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    pub audience: Audience,
    pub rule: &'static str,
    pub text: String,
}

static HOLDERS: &[Rule<Snapshot>] = &[
    Rule {
        name: "trail_in_uptrend",
        when: |s| s.trend == Trend::Bullish && s.price > s.ema10,
        render: |s| format!("Stay with the trend; trail the stop under EMA10 {:.2}.", s.ema10),
    },
    Rule {
        name: "defend_ema30",
        when: |s| s.price > s.ema30,
        render: |s| format!("Hold while closes stay above EMA30 {:.2}; a close below is the exit signal.", s.ema30),
    },
    Rule {
        name: "reduce_below_averages",
        when: |s| s.position == PricePosition::BelowAll,
        render: |s| format!("Price is under every average; reduce exposure and reassess near {:.2}.", s.low20),
    },
    Rule {
        name: "default",
        when: |_| true,
        render: |s| format!("Keep size modest; EMA40 {:.2} is the line that decides the medium trend.", s.ema40),
    },
];

static NEW_LONGS: &[Rule<Snapshot>] = &[
    Rule {
        name: "avoid_chasing",
        when: |s| s.rsi_above(RSI_OVERBOUGHT),
        render: |s| format!("Avoid chasing an overbought tape; wait for a pullback toward EMA10 {:.2}.", s.ema10),
    },
    Rule {
        name: "golden_cross_entry",
        when: |s| s.crossover == Some(Crossover::Golden) && s.price > s.ema30,
        render: |s| format!("Fresh golden cross above EMA30; a starter position with a stop below {:.2} is reasonable.", s.ema30),
    },
    Rule {
        name: "buy_the_dip",
        when: |s| s.trend == Trend::Bullish,
        render: |s| format!("Uptrend intact; look for entries on dips to EMA10 {:.2} or EMA30 {:.2}.", s.ema10, s.ema30),
    },
    Rule {
        name: "wait_for_base",
        when: |s| s.trend == Trend::Bearish,
        render: |s| format!("No entry while the averages point down; wait for a reclaim of EMA30 {:.2}.", s.ema30),
    },
    Rule {
        name: "default",
        when: |_| true,
        render: |s| format!("Direction is unclear; wait for a close above {:.2} before committing.", s.high20),
    },
];

static SHORT_TERM: &[Rule<Snapshot>] = &[
    Rule {
        name: "fade_overbought",
        when: |s| s.rsi_zone == RsiZone::Overbought,
        render: |s| format!("Take partial profits into strength; the 20-day high {:.2} is the first target to fade.", s.high20),
    },
    Rule {
        name: "oversold_bounce",
        when: |s| s.rsi_zone == RsiZone::Oversold,
        render: |s| format!("Oversold bounce setups only, with tight stops under {:.2}.", s.low20),
    },
    Rule {
        name: "range_trade",
        when: |_| true,
        render: |s| format!("Trade the range {:.2} to {:.2}; respect EMA10 {:.2} as the pivot.", s.low20, s.high20, s.ema10),
    },
];

/// One line per audience, in holders, new longs, short-term order.
pub fn advice(snap: &Snapshot) -> Vec<Advice> {
    [
        (Audience::Holders, HOLDERS),
        (Audience::NewLongs, NEW_LONGS),
        (Audience::ShortTerm, SHORT_TERM),
    ]
    .into_iter()
    .filter_map(|(audience, rules)| {
        first_match(rules, snap).map(|rule| Advice {
            audience,
            rule: rule.name,
            text: (rule.render)(snap),
        })
    })
    .collect()
}

pub fn advice_text(items: &[Advice]) -> String {
    items
        .iter()
        .map(|a| format!("{}: {}", a.audience.label(), a.text))
        .collect::<Vec<_>>()
        .join("\n")
}
