use thiserror::Error;

/// Errors surfaced by the data loader. Any of them halts the pipeline before
/// indicators are computed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The symbol failed validation and no request was sent.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// The source answered but had no usable rows (unknown symbol, delisted, all rows incomplete).
    #[error("no data found for {symbol}")]
    NoData { symbol: String },

    /// Network or transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The source returned an error payload.
    #[error("data source error: {0}")]
    Api(String),
}
