use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row count mismatch: table has {rows} rows but {derived} derived records were supplied")]
    RowCountMismatch { rows: usize, derived: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart error: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
