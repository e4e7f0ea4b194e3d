use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{
    Block, RecordId, Result, StorageError, DEFAULT_INDEX_MAX_DEGREE, TABLE_FILE_EXTENSION,
};
use crate::index::Index;
use crate::record::{Record, Schema, Value};
use crate::scan::{Predicate, RecordScanAdapter};
use crate::storage::page::{RecordPage, RecordPageRef};

use super::TableIterator;

/// A heap table stored in `<name>.tbl`, with its secondary indexes.
///
/// All records live in block 0. Indexes are in memory only and are kept in
/// step with every insert, update and delete.
pub struct Table {
    name: String,
    file_name: String,
    schema: Arc<Schema>,
    pool: Arc<BufferPool>,
    indexes: Vec<Index>,
    index_max_degree: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Arc<Schema>, pool: Arc<BufferPool>) -> Self {
        let name = name.into();
        let file_name = format!("{}.{}", name, TABLE_FILE_EXTENSION);
        Self {
            name,
            file_name,
            schema,
            pool,
            indexes: Vec::new(),
            index_max_degree: DEFAULT_INDEX_MAX_DEGREE,
        }
    }

    /// Sets the max degree used for indexes created after this call.
    pub fn with_index_max_degree(mut self, degree: usize) -> Self {
        self.index_max_degree = degree;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    fn data_block(&self) -> Block {
        Block::new(self.file_name.as_str(), 0)
    }

    /// Inserts a record and returns its id.
    pub fn insert_record(&mut self, record: &Record) -> Result<RecordId> {
        record.validate(&self.schema)?;
        let keys = self.index_keys(record)?;
        for (index, key) in self.indexes.iter().zip(&keys) {
            index.check_unique(key)?;
        }

        if self.pool.block_count(&self.file_name)? == 0 {
            self.pool.append_block(&self.file_name)?;
        }
        let block = self.data_block();

        let slot = {
            let mut pinned = self.pool.pin(&block)?;
            let mut page = pinned.write();
            let mut record_page = RecordPage::new(&mut page, &self.schema)?;
            record_page.insert(record)?
        };

        let rid = RecordId::new(block, slot);
        for (index, key) in self.indexes.iter_mut().zip(keys) {
            index.insert(key, rid.clone())?;
        }
        debug!(table = %self.name, rid = %rid, "inserted record");
        Ok(rid)
    }

    /// Reads the record at `rid`.
    pub fn get_record(&self, rid: &RecordId) -> Result<Record> {
        self.check_rid(rid)?;
        let pinned = self.pool.pin(&rid.block)?;
        let page = pinned.read();
        let record = RecordPageRef::new(&page, &self.schema)
            .get_record(rid.slot)
            .map_err(|e| not_found(e, rid))?;
        record.ok_or_else(|| StorageError::RecordNotFound(rid.clone()))
    }

    /// Replaces the record at `rid`, moving index entries whose key changed.
    pub fn update_record(&mut self, rid: &RecordId, record: &Record) -> Result<()> {
        record.validate(&self.schema)?;
        let old = self.get_record(rid)?;
        let old_keys = self.index_keys(&old)?;
        let new_keys = self.index_keys(record)?;

        for ((index, old_key), new_key) in self.indexes.iter().zip(&old_keys).zip(&new_keys) {
            if old_key != new_key {
                index.check_unique(new_key)?;
            }
        }

        {
            let mut pinned = self.pool.pin(&rid.block)?;
            let mut page = pinned.write();
            let mut record_page = RecordPage::new(&mut page, &self.schema)?;
            record_page
                .update(rid.slot, record)
                .map_err(|e| not_found(e, rid))?;
        }

        for ((index, old_key), new_key) in
            self.indexes.iter_mut().zip(old_keys).zip(new_keys)
        {
            if old_key != new_key {
                index.remove(&old_key, rid);
                index.insert(new_key, rid.clone())?;
            }
        }
        Ok(())
    }

    /// Deletes the record at `rid` and its index entries.
    pub fn delete_record(&mut self, rid: &RecordId) -> Result<()> {
        let old = self.get_record(rid)?;
        let old_keys = self.index_keys(&old)?;

        {
            let mut pinned = self.pool.pin(&rid.block)?;
            let mut page = pinned.write();
            let mut record_page = RecordPage::new(&mut page, &self.schema)?;
            record_page.delete(rid.slot).map_err(|e| not_found(e, rid))?;
        }

        for (index, key) in self.indexes.iter_mut().zip(old_keys) {
            index.remove(&key, rid);
        }
        debug!(table = %self.name, rid = %rid, "deleted record");
        Ok(())
    }

    /// Iterates over every live record.
    pub fn iter(&self) -> TableIterator {
        TableIterator::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.schema),
            self.file_name.clone(),
        )
    }

    /// Returns every record satisfying `predicate`.
    pub fn scan_where(&self, predicate: &Predicate) -> Result<Vec<(RecordId, Record)>> {
        let mut results = Vec::new();
        for item in self.iter() {
            let (rid, record) = item?;
            let scan = RecordScanAdapter::new(&record, &self.schema);
            if predicate.is_satisfied(&scan) {
                results.push((rid, record));
            }
        }
        Ok(results)
    }

    /// Builds an index over `column` from the rows already stored.
    pub fn create_index(&mut self, index_name: &str, column: &str, unique: bool) -> Result<()> {
        if self.indexes.iter().any(|i| i.name() == index_name) {
            return Err(StorageError::IndexAlreadyExists(index_name.to_string()));
        }
        let column_index = self
            .schema
            .column_index(column)
            .ok_or_else(|| StorageError::ColumnNotFound(column.to_string()))?;
        let column_name = self.schema.column(column_index).map_or(column, |c| c.name());

        let mut index = Index::new(
            index_name,
            self.name.as_str(),
            column_name,
            unique,
            self.index_max_degree,
        )?;
        for item in self.iter() {
            let (rid, record) = item?;
            let key = key_at(&record, column_index, column)?;
            index.insert(key, rid)?;
        }

        debug!(table = %self.name, index = index_name, entries = index.len(), "built index");
        self.indexes.push(index);
        Ok(())
    }

    /// Returns the first index on `column`, if any.
    pub fn index_for_column(&self, column: &str) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|i| i.column_name().eq_ignore_ascii_case(column))
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Looks up records through the index on `column`.
    pub fn find_by_index(&self, column: &str, key: &Value) -> Result<Vec<(RecordId, Record)>> {
        let index = self
            .index_for_column(column)
            .ok_or_else(|| StorageError::IndexNotFound(column.to_string()))?;

        index
            .search_all(&key.to_stored())
            .into_iter()
            .map(|rid| {
                let record = self.get_record(&rid)?;
                Ok((rid, record))
            })
            .collect()
    }

    /// Writes the table's dirty blocks to disk.
    pub fn flush(&self) -> Result<()> {
        let blocks = self.pool.block_count(&self.file_name)?;
        for block_num in 0..blocks {
            self.pool
                .flush_block(&Block::new(self.file_name.as_str(), block_num))?;
        }
        Ok(())
    }

    /// Key of each index, in index order.
    fn index_keys(&self, record: &Record) -> Result<Vec<Value>> {
        self.indexes
            .iter()
            .map(|index| {
                let column = index.column_name();
                let position = self
                    .schema
                    .column_index(column)
                    .ok_or_else(|| StorageError::ColumnNotFound(column.to_string()))?;
                key_at(record, position, column)
            })
            .collect()
    }

    fn check_rid(&self, rid: &RecordId) -> Result<()> {
        if rid.block.filename() != self.file_name {
            return Err(StorageError::RecordNotFound(rid.clone()));
        }
        Ok(())
    }
}

/// Index keys hold values in their stored form so they match rows read back.
fn key_at(record: &Record, position: usize, column: &str) -> Result<Value> {
    record
        .value(position)
        .map(Value::to_stored)
        .ok_or_else(|| StorageError::ColumnNotFound(column.to_string()))
}

fn not_found(err: StorageError, rid: &RecordId) -> StorageError {
    match err {
        StorageError::SlotNotFound(_) => StorageError::RecordNotFound(rid.clone()),
        other => other,
    }
}
