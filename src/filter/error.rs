use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Table not allowed: {0}")]
    TableNotAllowed(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid body: {0}")]
    InvalidBody(String),

    #[error("A filter is required for {0}")]
    MissingFilter(&'static str),
}
