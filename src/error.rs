use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridExtractionError {
    #[error("Grid could not be tokenized: {0}")]
    Parse(String),

    #[error("Invalid configuration for '{field}': {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Invalid cell coordinate ({row}, {col}) for a one-based grid")]
    InvalidCoordinate { row: usize, col: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridExtractionError>;
