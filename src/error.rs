//! Error types for veriframe

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image format: {0}")]
    InvalidFormat(String),

    #[error("Invalid JPEG structure: {0}")]
    InvalidJpeg(String),

    #[error("Invalid EXIF data: {0}")]
    InvalidExif(String),

    #[error("Collaborator unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Detector failed: {0}")]
    DetectorFailed(String),

    #[error("Deadline exceeded after {0} ms")]
    DeadlineExceeded(u64),

    #[error("Configuration error: {0}")]
    Config(String),
}
