//! Report assembly and the five-row table export.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;

use crate::bars::{Bar, Period};
use crate::indicators::IndicatorSeries;
use crate::narrative::advice::{Advice, advice, advice_text};
use crate::narrative::history::{HistoricalContext, historical_context, history_text};
use crate::narrative::levels::{KeyLevels, levels_text};
use crate::narrative::momentum::{RsiZone, macd_text, rsi_text, volume_note};
use crate::narrative::per_bar::{RECENT_BARS, interpret, recent_readings};
use crate::narrative::scenarios::{Scenario, forward_scenarios};
use crate::narrative::trend::{PricePosition, Trend, trend_text};
use crate::narrative::{Snapshot, quick_summary};

/// Below this many bars the report carries a reliability warning.
pub const LOW_HISTORY_BARS: usize = 20;

pub const CSV_HEADER: [&str; 8] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "rsi",
    "interpretation",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentBarRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub rsi: Option<f64>,
    pub interpretation: String,
}

impl RecentBarRow {
    /// Values as displayed: prices to 2 decimals, volume as an integer, RSI to 1 decimal.
    pub fn display_fields(&self) -> [String; 8] {
        [
            self.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", self.open),
            format!("{:.2}", self.high),
            format!("{:.2}", self.low),
            format!("{:.2}", self.close),
            format!("{:.0}", self.volume),
            self.rsi.map(|v| format!("{v:.1}")).unwrap_or_default(),
            self.interpretation.clone(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self> {
        if fields.len() != CSV_HEADER.len() {
            bail!("expected {} columns, found {}", CSV_HEADER.len(), fields.len());
        }
        let num = |i: usize| -> Result<f64> {
            fields[i]
                .parse::<f64>()
                .with_context(|| format!("column {} is not a number: {:?}", CSV_HEADER[i], fields[i]))
        };
        let rsi = if fields[6].is_empty() { None } else { Some(num(6)?) };

        Ok(Self {
            date: NaiveDate::parse_from_str(&fields[0], "%Y-%m-%d")
                .with_context(|| format!("bad date {:?}", fields[0]))?,
            open: num(1)?,
            high: num(2)?,
            low: num(3)?,
            close: num(4)?,
            volume: num(5)?,
            rsi,
            interpretation: fields[7].clone(),
        })
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Splits one CSV line, honouring double-quoted fields.
fn split_line(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if current.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if quoted {
        bail!("unterminated quoted field");
    }
    fields.push(current);
    Ok(fields)
}

/// Delimited text with a header row and the fixed column order.
pub fn to_csv(rows: &[RecentBarRow]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row.display_fields().iter().map(|f| escape_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Reads back text produced by [`to_csv`].
pub fn parse_csv(text: &str) -> Result<Vec<RecentBarRow>> {
    let mut lines = text.lines();
    let header = lines.next().context("empty table")?;
    if split_line(header)? != CSV_HEADER {
        bail!("unexpected header: {header}");
    }
    lines
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            split_line(line)
                .and_then(|fields| RecentBarRow::from_fields(&fields))
                .with_context(|| format!("row {}", i + 1))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportText {
    pub quick_summary: String,
    pub trend_text: String,
    pub indicators_text: String,
    pub volume_note: String,
    pub levels_text: String,
    pub history_text: String,
    pub composite_text: String,
    pub advice_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub symbol: String,
    pub period: Period,
    pub as_of: NaiveDate,
    pub bar_count: usize,
    pub warnings: Vec<String>,
    pub trend: Trend,
    pub position: PricePosition,
    pub rsi_zone: RsiZone,
    pub levels: KeyLevels,
    pub snapshot: Snapshot,
    pub recent: Vec<RecentBarRow>,
    pub history: Option<HistoricalContext>,
    pub scenarios: Vec<Scenario>,
    pub advice: Vec<Advice>,
    pub text: ReportText,
}

impl Report {
    pub fn recent_csv(&self) -> String {
        to_csv(&self.recent)
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}_last5.csv", self.symbol)
    }
}

/// Composes every block for the last bar. `None` when there are no bars or
/// the series does not line up with them.
pub fn assemble(
    symbol: &str,
    period: Period,
    bars: &[Bar],
    series: &IndicatorSeries,
) -> Option<Report> {
    if series.len() != bars.len() {
        return None;
    }
    let snapshot = Snapshot::latest(bars, series)?;
    let levels = KeyLevels::from_snapshot(&snapshot);
    let history = historical_context(bars, series);
    let scenarios = forward_scenarios(&snapshot);
    let advice = advice(&snapshot);

    let recent = recent_readings(bars, series)
        .iter()
        .zip(&bars[bars.len().saturating_sub(RECENT_BARS)..])
        .map(|(reading, bar)| RecentBarRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            rsi: reading.rsi,
            interpretation: interpret(reading),
        })
        .collect();

    let mut warnings = Vec::new();
    if bars.len() < LOW_HISTORY_BARS {
        warnings.push(format!(
            "Only {} bars available (fewer than {LOW_HISTORY_BARS}); some indicators may be unreliable.",
            bars.len()
        ));
    }

    let history_block = history_text(history.as_ref());
    let mut composite = vec![history_block.clone()];
    composite.extend(
        scenarios
            .iter()
            .map(|s| format!("{}: {}", s.kind.label(), s.text)),
    );

    let text = ReportText {
        quick_summary: quick_summary(&snapshot),
        trend_text: trend_text(&snapshot),
        indicators_text: format!("{} {}", macd_text(&snapshot), rsi_text(&snapshot)),
        volume_note: volume_note(&snapshot),
        levels_text: levels_text(&levels),
        history_text: history_block,
        composite_text: composite.join("\n"),
        advice_text: advice_text(&advice),
    };

    Some(Report {
        symbol: symbol.to_string(),
        period,
        as_of: snapshot.date,
        bar_count: bars.len(),
        warnings,
        trend: snapshot.trend,
        position: snapshot.position,
        rsi_zone: snapshot.rsi_zone,
        levels,
        snapshot,
        recent,
        history,
        scenarios,
        advice,
        text,
    })
}
