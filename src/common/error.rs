use thiserror::Error;

use super::types::{Block, RecordId};

/// Storage engine error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page boundary violation: {len} bytes at offset {offset} exceed capacity {capacity}")]
    PageBoundary {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("Invalid free space pointer: {0}")]
    InvalidFreeSpacePointer(u32),

    #[error("Checksum mismatch in {0}")]
    ChecksumMismatch(Block),

    #[error("Insufficient space: record needs {required} bytes, {available} available")]
    InsufficientSpace { required: usize, available: usize },

    #[error("Slot {0} not found")]
    SlotNotFound(u32),

    #[error("Record {0} not found")]
    RecordNotFound(RecordId),

    #[error("Duplicate key {key} in index {index}")]
    DuplicateKey { index: String, key: String },

    #[error("Buffer pool exhausted, all frames are pinned")]
    BufferPoolExhausted,

    #[error("Cache is full and every entry is pinned")]
    CacheFull,

    #[error("Block {0} is not cached")]
    BlockNotCached(Block),

    #[error("Type mismatch in column {column}: expected {expected}")]
    TypeMismatch { column: String, expected: String },

    #[error("Column {0} not found")]
    ColumnNotFound(String),

    #[error("Table {0} already exists")]
    TableAlreadyExists(String),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Index {0} already exists")]
    IndexAlreadyExists(String),

    #[error("Index {0} not found")]
    IndexNotFound(String),

    #[error("Invalid B+ tree degree {0}, must be at least 3")]
    InvalidDegree(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
