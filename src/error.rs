use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no files matching '{pattern}' found under {}", root.display())]
    SourceNotFound { root: PathBuf, pattern: String },

    #[error("schema error in {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} is not set (environment or .env file)")]
    MissingApiKey(&'static str),

    #[error("completion service error: {0}")]
    Completion(String),
}
