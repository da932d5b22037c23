use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading an artifact bundle into memory.
///
/// Any of these is fatal at startup: no engine is constructed from a
/// partially-loaded bundle.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    /// Bundle file does not exist
    #[error("Artifact bundle not found: {0}")]
    Missing(PathBuf),

    /// SQLite error while reading the bundle
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Structurally invalid content
    #[error("Corrupt artifact bundle: {0}")]
    Corrupt(String),

    /// Number of stored vectors differs from the number of recipes
    #[error("Vector count mismatch: {vectors} vectors for {records} recipes")]
    VectorCountMismatch { records: usize, vectors: usize },

    /// A stored vector does not match the vocabulary size
    #[error("Dimension mismatch for recipe {recipe}: expected {expected}, got {actual}")]
    DimensionMismatch {
        recipe: usize,
        expected: usize,
        actual: usize,
    },
}

/// Malformed recommendation request.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidQueryError {
    #[error("top_n must be a positive integer, got {0}")]
    NonPositiveTopN(i64),

    #[error("Unknown return column: {0}")]
    UnknownColumn(String),

    #[error("At least one return column is required")]
    NoColumns,

    #[error("Calorie preference must be a finite non-negative number, got {0}")]
    InvalidCaloriePreference(f64),
}

/// Errors raised while building a bundle from a recipe CSV.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Required header absent from the CSV
    #[error("CSV file must contain a '{0}' column")]
    MissingColumn(&'static str),

    #[error("CSV file did not contain any usable recipes")]
    Empty,
}
