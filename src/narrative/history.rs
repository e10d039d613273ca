use chrono::NaiveDate;
use serde::Serialize;

use crate::bars::Bar;
use crate::indicators::IndicatorSeries;

pub const HISTORY_WINDOW: usize = 10;

pub const INSUFFICIENT_HISTORY: &str =
    "Insufficient data: at least 10 bars are required for historical context.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayMove {
    pub date: NaiveDate,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalContext {
    pub change_pct: f64,
    pub volume_avg_shift_pct: f64,
    pub best_day: DayMove,
    pub worst_day: DayMove,
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 { 0.0 } else { (to / from - 1.0) * 100.0 }
}

/// Statistics over the trailing `HISTORY_WINDOW` bars. `None` with fewer bars.
pub fn historical_context(bars: &[Bar], series: &IndicatorSeries) -> Option<HistoricalContext> {
    let n = bars.len();
    if n < HISTORY_WINDOW || series.len() != n {
        return None;
    }
    let start = n - HISTORY_WINDOW;

    // Returns are taken between bars inside the window only.
    let moves: Vec<DayMove> = (start + 1..n)
        .map(|i| DayMove {
            date: bars[i].date,
            return_pct: pct_change(bars[i - 1].calc_price(), bars[i].calc_price()),
        })
        .collect();

    let best_day = *moves
        .iter()
        .max_by(|a, b| a.return_pct.total_cmp(&b.return_pct))?;
    let worst_day = *moves
        .iter()
        .min_by(|a, b| a.return_pct.total_cmp(&b.return_pct))?;

    Some(HistoricalContext {
        change_pct: pct_change(bars[start].calc_price(), bars[n - 1].calc_price()),
        volume_avg_shift_pct: pct_change(series.volume_ma20[start], series.volume_ma20[n - 1]),
        best_day,
        worst_day,
    })
}

pub fn history_text(context: Option<&HistoricalContext>) -> String {
    let Some(ctx) = context else {
        return INSUFFICIENT_HISTORY.to_string();
    };

    let best = if ctx.best_day.return_pct > 0.0 {
        format!(
            "largest up-day {} ({:+.2}%)",
            ctx.best_day.date, ctx.best_day.return_pct
        )
    } else {
        "no up-days".to_string()
    };
    let worst = if ctx.worst_day.return_pct < 0.0 {
        format!(
            "largest down-day {} ({:+.2}%)",
            ctx.worst_day.date, ctx.worst_day.return_pct
        )
    } else {
        "no down-days".to_string()
    };

    format!(
        "Last {HISTORY_WINDOW} sessions: price {:+.2}%, 20-day volume average {:+.1}%; {best}; {worst}.",
        ctx.change_pct, ctx.volume_avg_shift_pct
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::fixtures::{bars_from_closes, day, rising};
    use crate::indicators::IndicatorEngine;

    fn context(closes: &[f64]) -> Option<HistoricalContext> {
        let bars = bars_from_closes(closes);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        historical_context(&bars, &series)
    }

    #[test]
    fn fewer_than_ten_bars_is_insufficient() {
        let bars = rising(9);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        let ctx = historical_context(&bars, &series);
        assert!(ctx.is_none());
        assert_eq!(history_text(ctx.as_ref()), INSUFFICIENT_HISTORY);
    }

    #[test]
    fn finds_extreme_days_in_window() {
        // The moves into index 1 and 2 start outside the trailing ten bars.
        let closes = [
            100.0, 150.0, 100.0, 101.0, 102.0, 110.0, 109.0, 100.0, 101.0, 102.0, 103.0, 104.0,
        ];
        let ctx = context(&closes).unwrap();

        assert_eq!(ctx.best_day.date, day(5));
        assert!((ctx.best_day.return_pct - (110.0 / 102.0 - 1.0) * 100.0).abs() < 1e-9);
        assert_eq!(ctx.worst_day.date, day(7));
        assert!((ctx.change_pct - 4.0).abs() < 1e-9);
        assert_eq!(ctx.volume_avg_shift_pct, 0.0);
    }

    #[test]
    fn monotonic_window_reports_no_down_days() {
        let text = history_text(context(&(0..12).map(|i| 50.0 + i as f64).collect::<Vec<_>>()).as_ref());
        assert!(text.contains("no down-days"));
        assert!(text.contains("largest up-day"));
    }

    #[test]
    fn exactly_ten_bars_is_enough() {
        assert!(context(&[10.0; 10]).is_some());
    }
}
