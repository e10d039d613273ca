//! This module contains the report pipeline: load bars, compute indicators,
//! assemble the report, then hand it to the terminal and storage.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bars::Period;
use crate::cache::{CacheSnapshot, FetchCache};
use crate::comfy_table;
use crate::indicators::IndicatorEngine;
use crate::klines::YahooChartSource;
use crate::loader::{BarSource, DataLoader};
use crate::report::{LOW_HISTORY_BARS, Report, assemble};
use crate::storage_utils::{AppConfig, AsyncStorageManager};

/// Loader plus indicator engine. One report at a time.
pub struct ReportPipeline<S> {
    loader: DataLoader<S>,
    engine: IndicatorEngine,
}

impl<S: BarSource> ReportPipeline<S> {
    pub fn new(loader: DataLoader<S>) -> Result<Self> {
        Ok(Self {
            loader,
            engine: IndicatorEngine::new()?,
        })
    }

    /// Builds one report. A failed or empty fetch stops here, before any
    /// indicator is computed.
    pub async fn generate(&mut self, symbol: &str, period: Period) -> Result<Report> {
        let bars = self.loader.load(symbol, period).await?;
        if bars.len() < LOW_HISTORY_BARS {
            warn!(bars = bars.len(), "short history, indicators may be unreliable");
        }

        let series = self.engine.compute(&bars);
        let symbol = symbol.trim().to_uppercase();
        assemble(&symbol, period, &bars, &series).context("no bars to report on")
    }

    pub fn cache(&self) -> &FetchCache {
        self.loader.cache()
    }
}

/// File name (without `.json`) of the saved fetch cache.
pub const FETCH_CACHE_FILE: &str = "fetch_cache";

/// Restores the fetch cache saved by an earlier run. An unreadable file is
/// logged and replaced by an empty cache.
pub async fn load_fetch_cache(storage: &AsyncStorageManager, ttl: Duration) -> FetchCache {
    match storage.load_or_default::<CacheSnapshot>(FETCH_CACHE_FILE).await {
        Ok(snapshot) => FetchCache::from_snapshot(ttl, snapshot, Utc::now()),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable fetch cache");
            FetchCache::new(ttl)
        }
    }
}

/// Generates one report with the fetch cache restored from `storage` and
/// written back afterwards, so repeated runs within the TTL reuse the bars.
pub async fn generate_cached<S: BarSource>(
    storage: &AsyncStorageManager,
    source: S,
    ttl: Duration,
    symbol: &str,
    period: Period,
) -> Result<Report> {
    let cache = load_fetch_cache(storage, ttl).await;
    let mut pipeline = ReportPipeline::new(DataLoader::new(source, cache))?;
    let report = pipeline.generate(symbol, period).await?;

    match storage.save(FETCH_CACHE_FILE, &pipeline.cache().snapshot()).await {
        Ok(path) => debug!(path = %path.display(), "fetch cache saved"),
        Err(e) => warn!(error = %e, "could not save fetch cache"),
    }
    Ok(report)
}

/// Command-line overrides on top of `config.json`.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub symbol: Option<String>,
    pub period: Option<Period>,
    pub storage_dir: Option<PathBuf>,
    pub save: bool,
}

/// Runs the full report pipeline:
/// 1. Loads configuration from the storage directory.
/// 2. Fetches daily bars (or reuses the saved fetch cache) and builds the report.
/// 3. Prints it and, unless disabled, saves the JSON report and the five-row CSV.
pub async fn run_report_pipeline(options: RunOptions) -> Result<Report> {
    let storage = match &options.storage_dir {
        Some(dir) => AsyncStorageManager::new(dir.clone()).await?,
        None => AsyncStorageManager::new_relative("storage").await?,
    };
    let config: AppConfig = storage
        .load_or_default("config")
        .await
        .with_context(|| format!("reading config in {:?}", storage.base_dir))?;

    let symbol = options.symbol.unwrap_or(config.symbol.clone());
    let period = options.period.unwrap_or(config.period);

    // Step 1: Build the source
    let source = YahooChartSource::new(&config.user_agent)?;

    // Step 2: Generate the report, reusing cached bars from recent runs
    info!(%symbol, %period, "generating report");
    let report = generate_cached(&storage, source, config.cache_ttl(), &symbol, period).await?;

    // Step 3: Display
    println!("{}", comfy_table::render(&report));

    // Step 4: Persist
    if options.save {
        let json_path = storage.save(&format!("{}_report", report.symbol), &report).await?;
        let csv_path = storage
            .save_text(&report.csv_file_name(), &report.recent_csv())
            .await?;
        info!(json = %json_path.display(), csv = %csv_path.display(), "report saved");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Interval;
    use crate::bars::fixtures::day;
    use crate::error::LoadError;
    use crate::loader::RawRow;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource(Vec<RawRow>);

    #[async_trait]
    impl BarSource for StaticSource {
        async fn fetch(
            &self,
            _symbol: &str,
            _period: Period,
            _interval: Interval,
        ) -> Result<Vec<RawRow>, LoadError> {
            Ok(self.0.clone())
        }
    }

    struct CountingSource {
        rows: Vec<RawRow>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BarSource for CountingSource {
        async fn fetch(
            &self,
            _symbol: &str,
            _period: Period,
            _interval: Interval,
        ) -> Result<Vec<RawRow>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    fn rows(n: usize) -> Vec<RawRow> {
        (0..n)
            .map(|i| {
                let close = 50.0 + i as f64;
                RawRow {
                    date: day(i as u64),
                    open: Some(close - 0.5),
                    high: Some(close + 1.0),
                    low: Some(close - 1.0),
                    close: Some(close),
                    adjusted_close: Some(Some(close)),
                    volume: Some(10_000.0),
                }
            })
            .collect()
    }

    fn pipeline(rows: Vec<RawRow>) -> ReportPipeline<StaticSource> {
        ReportPipeline::new(DataLoader::new(StaticSource(rows), FetchCache::default())).unwrap()
    }

    #[tokio::test]
    async fn generates_report_for_symbol() {
        let report = pipeline(rows(30)).generate(" aapl ", Period::ThreeMonths).await.unwrap();
        assert_eq!(report.symbol, "AAPL");
        assert_eq!(report.bar_count, 30);
        assert_eq!(report.recent.len(), 5);
        assert!(report.history.is_some());
    }

    #[tokio::test]
    async fn empty_fetch_halts_with_no_data() {
        let err = pipeline(Vec::new())
            .generate("NOPE", Period::OneMonth)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::NoData { .. })
        ));
    }

    #[tokio::test]
    async fn repeated_runs_reuse_saved_fetch_cache() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(1800);

        for _ in 0..2 {
            let source = CountingSource {
                rows: rows(25),
                calls: Arc::clone(&calls),
            };
            let report = generate_cached(&storage, source, ttl, "MSFT", Period::OneMonth)
                .await
                .unwrap();
            assert_eq!(report.bar_count, 25);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(storage.base_dir.join("fetch_cache.json").exists());
    }

    #[tokio::test]
    async fn expired_or_corrupt_cache_fetches_again() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();
        storage.save_text("fetch_cache.json", "{ not json").await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let source = CountingSource {
                rows: rows(25),
                calls: Arc::clone(&calls),
            };
            generate_cached(&storage, source, Duration::ZERO, "MSFT", Period::OneMonth)
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
