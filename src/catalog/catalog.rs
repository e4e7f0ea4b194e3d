use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::buffer::BufferPool;
use crate::common::{RecordId, Result, StorageConfig, StorageError, DEFAULT_INDEX_MAX_DEGREE};
use crate::record::Record;
use crate::scan::RecordScanAdapter;
use crate::storage::disk::FileManager;
use crate::table::Table;

use super::{CreateIndexData, CreateTableData, InsertData, QueryData};

/// Registry of open tables sharing one buffer pool.
///
/// Each table sits behind its own mutex; the registry lock is only held
/// while looking tables up or adding and removing them.
pub struct Catalog {
    pool: Arc<BufferPool>,
    tables: RwLock<HashMap<String, Arc<Mutex<Table>>>>,
    index_max_degree: usize,
}

impl Catalog {
    /// Opens the data directory in `config` with a fresh buffer pool.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let file_manager = Arc::new(FileManager::with_checksums(
            &config.data_dir,
            config.verify_checksums,
        )?);
        let pool = Arc::new(BufferPool::from_config(config, file_manager)?);
        info!(
            data_dir = %config.data_dir.display(),
            pool_size = config.pool_size,
            k = config.lru_k,
            "opened catalog"
        );

        let mut catalog = Self::new(pool);
        catalog.index_max_degree = config.index_max_degree;
        Ok(catalog)
    }

    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            tables: RwLock::new(HashMap::new()),
            index_max_degree: DEFAULT_INDEX_MAX_DEGREE,
        }
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn create_table(&self, data: &CreateTableData) -> Result<Arc<Mutex<Table>>> {
        let mut tables = self.tables.write();
        if tables.contains_key(&data.table_name) {
            return Err(StorageError::TableAlreadyExists(data.table_name.clone()));
        }

        let table = Table::new(
            data.table_name.as_str(),
            Arc::new(data.schema.clone()),
            Arc::clone(&self.pool),
        )
        .with_index_max_degree(self.index_max_degree);
        let table = Arc::new(Mutex::new(table));
        tables.insert(data.table_name.clone(), Arc::clone(&table));

        info!(
            table = %data.table_name,
            columns = data.schema.column_count(),
            max_record_size = data.schema.max_record_size(),
            "created table"
        );
        Ok(table)
    }

    pub fn table(&self, name: &str) -> Result<Arc<Mutex<Table>>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    /// Forgets a table. Its file stays on disk.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        if self.tables.write().remove(name).is_none() {
            return Err(StorageError::TableNotFound(name.to_string()));
        }
        info!(table = name, "dropped table");
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn create_index(&self, data: &CreateIndexData, unique: bool) -> Result<()> {
        let table = self.table(&data.table_name)?;
        table
            .lock()
            .create_index(&data.index_name, &data.field_name, unique)?;
        info!(
            index = %data.index_name,
            table = %data.table_name,
            column = %data.field_name,
            unique,
            "created index"
        );
        Ok(())
    }

    pub fn insert(&self, data: &InsertData) -> Result<RecordId> {
        let table = self.table(&data.table_name)?;
        let mut table = table.lock();
        let record = data.to_record(table.schema())?;
        table.insert_record(&record)
    }

    /// Runs a query, using an index when the predicate pins an indexed
    /// column to a constant. Returned records hold the projected fields in
    /// the order requested.
    pub fn query(&self, data: &QueryData) -> Result<Vec<Record>> {
        let table = self.table(&data.table_name)?;
        let table = table.lock();
        let schema = Arc::clone(table.schema());

        let projection: Option<Vec<usize>> = if data.projects_all() {
            None
        } else {
            Some(
                data.fields
                    .iter()
                    .map(|f| {
                        schema
                            .column_index(f)
                            .ok_or_else(|| StorageError::ColumnNotFound(f.clone()))
                    })
                    .collect::<Result<_>>()?,
            )
        };

        let indexed = table.indexes().iter().find_map(|index| {
            data.predicate
                .equates_with_constant(index.column_name())
                .map(|key| (index.column_name().to_string(), key.clone()))
        });
        let rows: Vec<(RecordId, Record)> = match indexed {
            Some((column, key)) => table
                .find_by_index(&column, &key)?
                .into_iter()
                .filter(|(_, record)| {
                    let scan = RecordScanAdapter::new(record, &schema);
                    data.predicate.is_satisfied(&scan)
                })
                .collect(),
            None => table.scan_where(&data.predicate)?,
        };

        Ok(rows
            .into_iter()
            .map(|(_, record)| match &projection {
                None => record,
                Some(columns) => Record::new(
                    columns
                        .iter()
                        .filter_map(|&i| record.value(i).cloned())
                        .collect(),
                ),
            })
            .collect())
    }

    /// Writes every dirty block to disk.
    pub fn flush_all(&self) -> Result<()> {
        self.pool.flush_all()
    }

    /// Flushes and releases the buffer pool.
    pub fn close(&self) -> Result<()> {
        self.pool.close()?;
        info!(tables = self.tables.read().len(), "closed catalog");
        Ok(())
    }
}
