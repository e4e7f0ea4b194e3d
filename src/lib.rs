//! Litestore - an embedded relational storage engine
//!
//! Tables are stored as fixed-size blocks on disk and accessed through a
//! shared buffer pool that caches pages in memory and evicts them with an
//! LRU-K policy. Rows live in slotted record pages and can be looked up
//! through in-memory B+Tree indexes.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): Disk I/O and page layout
//!   - `FileManager`: Reads, writes and appends blocks of table files
//!   - `Page`: A 4 KiB page with a checksummed header and typed accessors
//!   - `RecordPage`: Slotted layout for variable-length records
//!
//! - **Buffer Pool** (`buffer`): Memory management for pages
//!   - `BufferPool`: Pins blocks, tracks dirty pages and writes them back
//!   - `LruKCache`: Bounded map with LRU-K eviction that skips pinned entries
//!   - `PinnedBlock`: RAII guard that unpins its block when dropped
//!
//! - **Records** (`record`): `Schema`, `Value` and the `Record` codec
//!
//! - **Tables** (`table`): Record CRUD, full scans and index maintenance
//!
//! - **Index** (`index`): Arena-based `BplusTree` and the `Index` wrapper
//!
//! - **Scan** (`scan`): Predicates evaluated over records
//!
//! - **Catalog** (`catalog`): Table registry and request types
//!
//! # Example
//!
//! ```rust,no_run
//! use litestore::catalog::{Catalog, CreateTableData, InsertData};
//! use litestore::common::StorageConfig;
//! use litestore::record::{Schema, Value};
//!
//! let catalog = Catalog::open(&StorageConfig::new("data")).unwrap();
//!
//! let schema = Schema::builder().integer("id").varchar("name", 32).build();
//! catalog.create_table(&CreateTableData::new("users", schema)).unwrap();
//!
//! let rid = catalog
//!     .insert(&InsertData::new(
//!         "users",
//!         vec!["id".into(), "name".into()],
//!         vec![Value::Int(1), Value::from("alice")],
//!     ))
//!     .unwrap();
//!
//! let users = catalog.table("users").unwrap();
//! let record = users.lock().get_record(&rid).unwrap();
//! assert_eq!(record.value(1), Some(&Value::from("alice")));
//!
//! catalog.close().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod index;
pub mod record;
pub mod scan;
pub mod storage;
pub mod table;

// Re-export commonly used types at the crate root
pub use common::{Block, RecordId, Result, StorageError};
