pub mod config;
mod error;
mod types;

pub use config::*;
pub use error::{Result, StorageError};
pub use types::{Block, FrameId, RecordId, Timestamp};
