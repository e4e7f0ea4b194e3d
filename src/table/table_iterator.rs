use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Block, RecordId, Result};
use crate::record::{Record, Schema};
use crate::storage::page::RecordPageRef;

/// Iterator over a table's live records, block by block.
///
/// Each block is pinned only while its records are copied out. Iteration
/// ends at the last block or the first block holding no records. An error
/// is yielded once and ends the iteration.
pub struct TableIterator {
    pool: Arc<BufferPool>,
    schema: Arc<Schema>,
    file_name: String,
    next_block: u32,
    block_count: Option<u32>,
    pending: VecDeque<(RecordId, Record)>,
    done: bool,
}

impl TableIterator {
    pub(crate) fn new(pool: Arc<BufferPool>, schema: Arc<Schema>, file_name: String) -> Self {
        Self {
            pool,
            schema,
            file_name,
            next_block: 0,
            block_count: None,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Loads the records of the next block. Returns false when there is
    /// nothing left to load.
    fn load_next_block(&mut self) -> Result<bool> {
        let block_count = match self.block_count {
            Some(count) => count,
            None => {
                let count = self.pool.block_count(&self.file_name)?;
                self.block_count = Some(count);
                count
            }
        };
        if self.next_block >= block_count {
            return Ok(false);
        }

        let block = Block::new(self.file_name.as_str(), self.next_block);
        self.next_block += 1;

        let pinned = self.pool.pin(&block)?;
        let records = RecordPageRef::new(&pinned.read(), &self.schema).get_all_records()?;
        drop(pinned);
        if records.is_empty() {
            return Ok(false);
        }

        self.pending.extend(
            records
                .into_iter()
                .map(|(slot, record)| (RecordId::new(block.clone(), slot), record)),
        );
        Ok(true)
    }
}

impl Iterator for TableIterator {
    type Item = Result<(RecordId, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match self.load_next_block() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::buffer::BufferPool;
    use crate::record::{Record, Schema, Value};
    use crate::storage::disk::FileManager;
    use crate::table::Table;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_iter_empty_table() {
        let temp = TempDir::new().unwrap();
        let pool = Arc::new(BufferPool::new(4, 2, Arc::new(FileManager::new(temp.path()).unwrap())));
        let table = Table::new("t", Schema::builder().integer("a").build_arc(), pool);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_iter_skips_deleted_and_unpins() {
        let temp = TempDir::new().unwrap();
        let pool = Arc::new(BufferPool::new(4, 2, Arc::new(FileManager::new(temp.path()).unwrap())));
        let mut table = Table::new("t", Schema::builder().integer("a").build_arc(), Arc::clone(&pool));

        let rids: Vec<_> = (0..4)
            .map(|i| table.insert_record(&Record::new(vec![Value::Int(i)])).unwrap())
            .collect();
        table.delete_record(&rids[1]).unwrap();

        let rows: Vec<_> = table.iter().map(|r| r.unwrap()).collect();
        let values: Vec<i32> = rows.iter().map(|(_, r)| r.values()[0].as_int().unwrap()).collect();
        assert_eq!(values, vec![0, 2, 3]);
        assert_eq!(rows[1].0, rids[2]);
        assert_eq!(pool.pin_count(&rids[0].block), Some(0));
    }
}
