//! Error taxonomy (§7). One variant per row of the spec's error table; every
//! fallible path in this crate returns `Result<T, BloscError>`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BloscError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("invalid chunk header: {0}")]
    InvalidHeader(String),

    #[error("unsupported chunk format version {0}")]
    VersionUnsupported(u8),

    #[error("source buffer shorter than required")]
    ReadBufferShort,

    #[error("destination buffer too small")]
    WriteBufferShort,

    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("block is incompressible and raw copy does not fit the output budget")]
    Incompressible,

    #[error("unsupported codec id {0}")]
    CodecUnsupported(u8),

    #[error("dictionary error: {0}")]
    CodecDict(String),

    #[error("filter pipeline failed: {0}")]
    FilterPipeline(String),

    #[error("failed to start worker thread: {0}")]
    ThreadCreate(String),

    #[error("scratch buffer allocation failed")]
    Allocation,
}

pub type Result<T> = std::result::Result<T, BloscError>;
