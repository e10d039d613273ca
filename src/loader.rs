//! Data loader: validates the request, consults the fetch cache, and cleans
//! whatever the source returns into an ascending run of complete bars.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info};

use crate::bars::{Bar, Interval, Period};
use crate::cache::{CacheKey, FetchCache};
use crate::error::LoadError;

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9.\-^=]{1,15}$").expect("symbol pattern compiles"));

/// A row as delivered by a source. Any field may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    /// `None` when the source has no adjusted column at all.
    pub adjusted_close: Option<Option<f64>>,
    pub volume: Option<f64>,
}

/// Anything that can return OHLCV rows for a symbol.
#[async_trait]
pub trait BarSource {
    async fn fetch(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<RawRow>, LoadError>;
}

pub fn normalize_symbol(symbol: &str) -> Result<String, LoadError> {
    let normalized = symbol.trim().to_uppercase();
    if SYMBOL_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(LoadError::InvalidSymbol(symbol.to_string()))
    }
}

/// Drops incomplete rows, sorts by date and keeps the first row per date.
pub fn clean_rows(rows: Vec<RawRow>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = rows.into_iter().filter_map(complete_bar).collect();
    bars.sort_by_key(|bar| bar.date);
    bars.dedup_by_key(|bar| bar.date);
    bars
}

fn complete_bar(row: RawRow) -> Option<Bar> {
    let adjusted_close = match row.adjusted_close {
        Some(column) => Some(column.filter(|v| v.is_finite())?),
        None => None,
    };
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

    Some(Bar {
        date: row.date,
        open: finite(row.open)?,
        high: finite(row.high)?,
        low: finite(row.low)?,
        close: finite(row.close)?,
        adjusted_close,
        volume: finite(row.volume)?,
    })
}

pub struct DataLoader<S> {
    source: S,
    cache: FetchCache,
}

impl<S: BarSource> DataLoader<S> {
    pub fn new(source: S, cache: FetchCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Returns cleaned daily bars for `symbol`, from cache when fresh.
    /// Failed or empty fetches are reported and never cached.
    pub async fn load(&mut self, symbol: &str, period: Period) -> Result<Vec<Bar>, LoadError> {
        let symbol = normalize_symbol(symbol)?;
        let interval = Interval::Daily;
        let key = CacheKey::new(&symbol, period, interval);

        if let Some(bars) = self.cache.get(&key) {
            debug!(%symbol, %period, bars = bars.len(), "cache hit");
            return Ok(bars);
        }

        debug!(
            %symbol,
            %period,
            ttl_secs = self.cache.ttl().as_secs(),
            "cache miss, fetching"
        );
        let rows = self.source.fetch(&symbol, period, interval).await?;
        let fetched = rows.len();
        let bars = clean_rows(rows);

        if bars.is_empty() {
            return Err(LoadError::NoData { symbol });
        }

        info!(
            %symbol,
            %period,
            fetched,
            kept = bars.len(),
            "loaded daily bars"
        );
        self.cache.insert(key, bars.clone());
        Ok(bars)
    }
}
