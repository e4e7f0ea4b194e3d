use std::path::{Path, PathBuf};

use super::error::{Result, StorageError};

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Size of the reserved page header in bytes
pub const PAGE_HEADER_SIZE: usize = 32;

/// Usable bytes in a page's data region
pub const PAGE_DATA_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Size of one slot directory entry (offset: i32, length: i32)
pub const SLOT_SIZE: usize = 8;

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRUK_K: usize = 2;

/// Default buffer pool size (number of frames)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 50;

/// Default maximum degree of index B+ trees
pub const DEFAULT_INDEX_MAX_DEGREE: usize = 100;

/// Smallest degree a B+ tree can split with
pub const MIN_BTREE_DEGREE: usize = 3;

/// Longest VARCHAR value stored in a record (1-byte length prefix)
pub const MAX_VARCHAR_BYTES: usize = 255;

/// Insert compacts a full page when more than this fraction of slots is deleted
pub const INSERT_COMPACTION_THRESHOLD: f64 = 0.2;

/// Delete compacts a page when more than this fraction of slots is deleted
pub const DELETE_COMPACTION_THRESHOLD: f64 = 0.3;

/// Files in the data directory starting with this prefix are purged on startup
pub const TEMP_FILE_PREFIX: &str = "temp";

/// Extension of table files
pub const TABLE_FILE_EXTENSION: &str = "tbl";

/// Default location of table files
pub const DEFAULT_DATA_DIR: &str = "data";

/// Runtime settings for a storage engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory holding the table files
    pub data_dir: PathBuf,
    /// Number of frames in the buffer pool
    pub pool_size: usize,
    /// K for LRU-K eviction
    pub lru_k: usize,
    /// Maximum degree for index B+ trees
    pub index_max_degree: usize,
    /// Whether page checksums are verified when blocks are read
    pub verify_checksums: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            pool_size: DEFAULT_BUFFER_POOL_SIZE,
            lru_k: DEFAULT_LRUK_K,
            index_max_degree: DEFAULT_INDEX_MAX_DEGREE,
            verify_checksums: true,
        }
    }
}

impl StorageConfig {
    /// Creates a configuration rooted at the given data directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_lru_k(mut self, k: usize) -> Self {
        self.lru_k = k;
        self
    }

    pub fn with_index_max_degree(mut self, degree: usize) -> Self {
        self.index_max_degree = degree;
        self
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.lru_k == 0 {
            return Err(StorageError::InvalidConfig(
                "lru_k must be at least 1".to_string(),
            ));
        }
        if self.index_max_degree < MIN_BTREE_DEGREE {
            return Err(StorageError::InvalidConfig(format!(
                "index_max_degree must be at least {}",
                MIN_BTREE_DEGREE
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StorageConfig::default();
        assert_eq!(config.pool_size, DEFAULT_BUFFER_POOL_SIZE);
        assert_eq!(config.lru_k, DEFAULT_LRUK_K);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = StorageConfig::new("/tmp/x").with_pool_size(0);
        assert!(matches!(
            config.validate(),
            Err(StorageError::InvalidConfig(_))
        ));

        let config = StorageConfig::new("/tmp/x").with_index_max_degree(2);
        assert!(config.validate().is_err());

        let config = StorageConfig::new("/tmp/x").with_lru_k(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_geometry() {
        assert_eq!(PAGE_DATA_SIZE, 4064);
        assert_eq!(PAGE_HEADER_SIZE % 8, 0);
    }
}
