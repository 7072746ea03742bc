use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("Seats not available: {}", .0.join(", "))]
    SeatUnavailable(Vec<String>),

    #[error("Seat {0} is not available")]
    InvalidSeat(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, BookingError>;
