use std::path::PathBuf;

use thiserror::Error;

/// Structural problems with an input file. Fatal to the import call;
/// nothing is committed when one of these surfaces.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("file is not valid {0}")]
    Encoding(&'static str),
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("no data rows in file")]
    Empty,
}

/// Persistence-layer failure. The batch write is a single transaction,
/// so retrying after one of these is safe.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Public error of the import pipeline. Callers get either a populated
/// `ImportStats` or one of these; there is no partial-success shape.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
