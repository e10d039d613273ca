use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};

use crate::narrative::momentum::{RSI_OVERBOUGHT, RSI_OVERSOLD};
use crate::narrative::trend::Trend;
use crate::report::Report;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn trend_color(trend: Trend) -> Color {
    match trend {
        Trend::Bullish => Color::Green,
        Trend::Bearish => Color::Red,
        Trend::Mixed => Color::Yellow,
    }
}

fn rsi_cell(rsi: Option<f64>) -> Cell {
    match rsi {
        Some(v) => {
            let color = if v > RSI_OVERBOUGHT {
                Color::Red
            } else if v < RSI_OVERSOLD {
                Color::Green
            } else {
                Color::Reset
            };
            Cell::new(format!("{v:.1}"))
                .fg(color)
                .set_alignment(CellAlignment::Right)
        }
        None => Cell::new("n/a")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
    }
}

/// Narrative blocks, one per row.
pub fn summary_table(report: &Report) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Section", "Reading"]));

    let trend_cell = Cell::new(report.trend.label())
        .fg(trend_color(report.trend))
        .add_attribute(Attribute::Bold);
    table.add_row(vec![Cell::new("Trend"), trend_cell]);

    let rows = [
        ("Quick summary", &report.text.quick_summary),
        ("Indicators", &report.text.indicators_text),
        ("Volume", &report.text.volume_note),
        ("Key levels", &report.text.levels_text),
        ("Outlook", &report.text.composite_text),
        ("Advice", &report.text.advice_text),
    ];
    for (section, text) in rows {
        table.add_row(vec![Cell::new(section).fg(Color::DarkGrey), Cell::new(text)]);
    }
    table
}

/// The five-row recent-bar table, same columns as the CSV export.
pub fn recent_table(report: &Report) -> Table {
    let mut table = base_table();
    table.set_header(header(&[
        "Date", "Open", "High", "Low", "Close", "Volume", "RSI", "Interpretation",
    ]));

    for row in &report.recent {
        let fields = row.display_fields();
        let close_color = if row.close >= row.open {
            Color::Green
        } else {
            Color::Red
        };

        table.add_row(vec![
            Cell::new(&fields[0]).fg(Color::DarkGrey),
            Cell::new(&fields[1]).set_alignment(CellAlignment::Right),
            Cell::new(&fields[2]).set_alignment(CellAlignment::Right),
            Cell::new(&fields[3]).set_alignment(CellAlignment::Right),
            Cell::new(&fields[4])
                .fg(close_color)
                .set_alignment(CellAlignment::Right),
            Cell::new(&fields[5]).set_alignment(CellAlignment::Right),
            rsi_cell(row.rsi),
            Cell::new(&fields[7]),
        ]);
    }
    table
}

pub fn render(report: &Report) -> String {
    let title = format!(
        "{} ({} daily bars, period {}, as of {})",
        report.symbol, report.bar_count, report.period, report.as_of
    );
    let mut out = format!("\n{}\n", title);
    for warning in &report.warnings {
        out.push_str(&format!("! {}\n", warning));
    }
    out.push_str(&format!("{}\n", summary_table(report)));
    out.push_str(&format!("\nLast {} bars\n{}\n", report.recent.len(), recent_table(report)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Period;
    use crate::bars::fixtures::rising;
    use crate::indicators::IndicatorEngine;
    use crate::report::assemble;

    #[test]
    fn render_contains_title_blocks_and_rows() {
        let bars = rising(12);
        let series = IndicatorEngine::new().unwrap().compute(&bars);
        let report = assemble("TSLA", Period::OneMonth, &bars, &series).unwrap();

        let text = render(&report);
        assert!(text.contains("TSLA (12 daily bars, period 1mo, as of 2024-01-12)"));
        assert!(text.contains("! Only 12 bars available"));
        assert_eq!(summary_table(&report).row_iter().count(), 7);
        assert_eq!(recent_table(&report).row_iter().count(), 5);
    }
}
