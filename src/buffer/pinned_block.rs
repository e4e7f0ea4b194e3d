use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::Block;
use crate::storage::page::Page;

use super::{BufferPool, PageRef};

/// RAII pin on a block.
/// Unpins the block when dropped, marking it dirty first if it was written.
pub struct PinnedBlock<'a> {
    pool: &'a BufferPool,
    block: Block,
    page: PageRef,
    /// Whether the page was handed out for writing
    dirty: bool,
}

impl<'a> PinnedBlock<'a> {
    pub(crate) fn new(pool: &'a BufferPool, block: Block, page: PageRef) -> Self {
        Self {
            pool,
            block,
            page,
            dirty: false,
        }
    }

    /// Returns the pinned block.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Locks the page for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Locks the page for writing. The block is marked dirty on release.
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.dirty = true;
        self.page.write()
    }

    /// Marks the block dirty on release without taking the page lock.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Drop for PinnedBlock<'_> {
    fn drop(&mut self) {
        self.pool.release(&self.block, self.dirty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::FileManager;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_pinned_block_unpins_on_drop() {
        let temp = TempDir::new().unwrap();
        let pool = BufferPool::new(4, 2, Arc::new(FileManager::new(temp.path()).unwrap()));
        let block = pool.append_block("t.tbl").unwrap();

        {
            let pinned = pool.pin(&block).unwrap();
            assert_eq!(pinned.block(), &block);
            assert_eq!(pool.pin_count(&block), Some(1));
            assert_eq!(pinned.read().get_int(0).unwrap(), 0);
        }
        assert_eq!(pool.pin_count(&block), Some(0));
        assert_eq!(pool.is_dirty(&block), Some(false));
    }

    #[test]
    fn test_pinned_block_write_marks_dirty() {
        let temp = TempDir::new().unwrap();
        let pool = BufferPool::new(4, 2, Arc::new(FileManager::new(temp.path()).unwrap()));
        let block = pool.append_block("t.tbl").unwrap();

        {
            let mut pinned = pool.pin(&block).unwrap();
            pinned.write().set_int(4, 11).unwrap();
            assert!(pinned.is_dirty());
            assert_eq!(pool.is_dirty(&block), Some(false));
        }
        assert_eq!(pool.is_dirty(&block), Some(true));

        {
            let mut pinned = pool.pin(&block).unwrap();
            pinned.mark_dirty();
        }
        assert_eq!(pool.pin_count(&block), Some(0));
    }
}
