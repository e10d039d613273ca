use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, header};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::bars::{Interval, Period};
use crate::error::LoadError;
use crate::loader::{BarSource, RawRow};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// --- Response Structures ---

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug, Default)]
struct Meta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    #[serde(default)]
    open: Vec<Num>,
    #[serde(default)]
    high: Vec<Num>,
    #[serde(default)]
    low: Vec<Num>,
    #[serde(default)]
    close: Vec<Num>,
    #[serde(default)]
    volume: Vec<Num>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Num>,
}

/// A price cell: number, numeric string, or null.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(transparent)]
struct Num(#[serde(deserialize_with = "deserialize_f64_lenient")] Option<f64>);

struct LenientF64Visitor;

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a float, an integer, null, or a string representing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.trim().is_empty() {
            Ok(None)
        } else {
            v.parse::<f64>().map(Some).map_err(E::custom)
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64Visitor)
}

fn cell(series: &[Num], i: usize) -> Option<f64> {
    series.get(i).and_then(|n| n.0)
}

// --- Parsing ---

/// Turns a chart response body into raw rows, one per timestamp.
fn parse_chart(body: &[u8], symbol: &str) -> Result<Vec<RawRow>, LoadError> {
    let envelope: ChartEnvelope = serde_json::from_slice(body)
        .map_err(|e| LoadError::Api(format!("malformed chart response: {e}")))?;

    if let Some(err) = envelope.chart.error {
        return if err.code.eq_ignore_ascii_case("Not Found") {
            Err(LoadError::NoData {
                symbol: symbol.to_string(),
            })
        } else {
            Err(LoadError::Api(format!("{}: {}", err.code, err.description)))
        };
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(LoadError::NoData {
            symbol: symbol.to_string(),
        });
    };

    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };
    let adjclose = result.indicators.adjclose.first();
    let offset = result.meta.gmtoffset;

    let rows = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let local = ts.checked_add(offset)?;
            let date = DateTime::from_timestamp(local, 0)?.date_naive();
            Some(RawRow {
                date,
                open: cell(&quote.open, i),
                high: cell(&quote.high, i),
                low: cell(&quote.low, i),
                close: cell(&quote.close, i),
                adjusted_close: adjclose.map(|a| cell(&a.adjclose, i)),
                volume: cell(&quote.volume, i),
            })
        })
        .collect();

    Ok(rows)
}

// --- Source ---

/// Daily bars from the public Yahoo Finance chart endpoint.
pub struct YahooChartSource {
    client: Client,
}

impl YahooChartSource {
    pub fn new(user_agent: &str) -> Result<Self, LoadError> {
        let mut headers = header::HeaderMap::new();
        let agent = header::HeaderValue::from_str(user_agent)
            .map_err(|e| LoadError::Api(format!("invalid user agent: {e}")))?;
        headers.insert(header::USER_AGENT, agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BarSource for YahooChartSource {
    async fn fetch(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<RawRow>, LoadError> {
        let url = format!("{CHART_URL}/{symbol}");
        let query = [
            ("range", period.as_str()),
            ("interval", interval.as_str()),
            ("includeAdjustedClose", "true"),
        ];

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%symbol, %status, bytes = body.len(), "chart response");

        match parse_chart(&body, symbol) {
            Ok(rows) => Ok(rows),
            Err(LoadError::Api(msg)) if !status.is_success() => {
                warn!(%symbol, %status, "chart request rejected");
                Err(LoadError::Api(format!("HTTP {status}: {msg}")))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
      "chart": {
        "result": [{
          "meta": { "symbol": "TSLA", "gmtoffset": -14400 },
          "timestamp": [1717507800, 1717594200, 1717680600],
          "indicators": {
            "quote": [{
              "open":   [174.78, 175.35, null],
              "high":   [177.76, 176.15, 179.73],
              "low":    [174.0, 172.13, 172.73],
              "close":  [175.0, 174.77, 177.94],
              "volume": [67123400, "60056300", 69887000]
            }],
            "adjclose": [{ "adjclose": [175.0, 174.77, 177.94] }]
          }
        }],
        "error": null
      }
    }"#;

    #[test]
    fn parses_rows_with_local_dates() {
        let rows = parse_chart(SAMPLE.as_bytes(), "TSLA").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_eq!(rows[1].volume, Some(60_056_300.0));
        assert_eq!(rows[2].open, None);
        assert_eq!(rows[2].adjusted_close, Some(Some(177.94)));
    }

    #[test]
    fn missing_adjclose_column_is_distinguished() {
        let body = r#"{"chart":{"result":[{"meta":{},"timestamp":[1717507800],
            "indicators":{"quote":[{"open":[1],"high":[2],"low":[0.5],"close":[1.5],"volume":[10]}]}}],"error":null}}"#;
        let rows = parse_chart(body.as_bytes(), "X").unwrap();
        assert_eq!(rows[0].adjusted_close, None);
        assert_eq!(rows[0].close, Some(1.5));
    }

    #[test]
    fn not_found_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body.as_bytes(), "NOPE").unwrap_err();
        assert!(matches!(err, LoadError::NoData { .. }));
    }

    #[test]
    fn other_errors_are_api_errors() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let err = parse_chart(body.as_bytes(), "X").unwrap_err();
        assert!(matches!(err, LoadError::Api(ref m) if m.contains("Invalid input")));
    }

    #[test]
    fn out_of_range_timestamps_drop_the_row() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":3600},
            "timestamp":[9223372036854775807, 1717507800, -9223372036854775808],
            "indicators":{"quote":[{"open":[1,1,1],"high":[2,2,2],"low":[0.5,0.5,0.5],
            "close":[1.5,1.5,1.5],"volume":[10,10,10]}]}}],"error":null}}"#;
        let rows = parse_chart(body.as_bytes(), "X").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
    }
}
