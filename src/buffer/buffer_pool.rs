use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::common::{Block, FrameId, Result, StorageConfig, StorageError};
use crate::storage::disk::FileManager;

use super::{Frame, LruKCache, PageRef, PinnedBlock};

/// State guarded by the pool's single lock
struct PoolState {
    /// Frames bound to blocks, keyed by block
    cache: LruKCache<Block, Frame>,
    /// Frames not bound to any block
    free_list: VecDeque<Frame>,
}

/// BufferPool caches blocks of table files in a fixed number of frames.
///
/// A cache miss takes a frame from the free list, or evicts the unpinned
/// frame the LRU-K policy picks, writing it back first if it is dirty.
/// Pinned frames are never evicted; when every frame is pinned a miss fails
/// with `BufferPoolExhausted`.
///
/// All pool operations run under one mutex. Page contents sit behind a
/// per-frame `RwLock` that is always taken after the pool lock, so callers
/// must release page guards before calling back into the pool.
pub struct BufferPool {
    /// Number of frames in the buffer pool
    pool_size: usize,
    state: Mutex<PoolState>,
    file_manager: Arc<FileManager>,
}

impl BufferPool {
    /// Creates a buffer pool with `pool_size` frames and LRU-`k` eviction.
    pub fn new(pool_size: usize, k: usize, file_manager: Arc<FileManager>) -> Self {
        let free_list = (0..pool_size)
            .map(|i| Frame::new(FrameId::new(i as u32)))
            .collect();

        Self {
            pool_size,
            state: Mutex::new(PoolState {
                cache: LruKCache::new(pool_size, k),
                free_list,
            }),
            file_manager,
        }
    }

    /// Creates a buffer pool sized by `config`.
    pub fn from_config(config: &StorageConfig, file_manager: Arc<FileManager>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.pool_size, config.lru_k, file_manager))
    }

    /// Pins `block` and returns its page, reading it from disk on a miss.
    pub fn pin_block(&self, block: &Block) -> Result<PageRef> {
        let mut state = self.state.lock();

        if let Some(frame) = state.cache.get(block) {
            let pins = frame.pin();
            trace!(block = %block, pins, "buffer pool hit");
            return Ok(frame.page());
        }

        let mut frame = self.take_frame(&mut state)?;
        let read = {
            let page = frame.page();
            let mut page = page.write();
            self.file_manager.read(block, &mut page)
        };
        if let Err(e) = read {
            frame.reset();
            state.free_list.push_back(frame);
            return Err(e);
        }

        frame.assign(block.clone());
        frame.pin();
        let page = frame.page();
        debug!(block = %block, frame = frame.frame_id().as_u32(), "buffer pool miss");

        // a frame was freed above, so this never evicts
        state.cache.put(block.clone(), frame)?;
        Ok(page)
    }

    /// Pins `block` behind a guard that unpins it when dropped.
    pub fn pin(&self, block: &Block) -> Result<PinnedBlock<'_>> {
        let page = self.pin_block(block)?;
        Ok(PinnedBlock::new(self, block.clone(), page))
    }

    /// Releases one pin on `block`. The pin count never drops below zero
    /// and unknown blocks are ignored.
    pub fn unpin_block(&self, block: &Block) {
        self.release(block, false);
    }

    /// Marks the cached frame of `block` as modified.
    pub fn mark_dirty_block(&self, block: &Block) -> Result<()> {
        let mut state = self.state.lock();
        match state.cache.peek_mut(block) {
            Some(frame) => {
                frame.set_dirty(true);
                Ok(())
            }
            None => Err(StorageError::BlockNotCached(block.clone())),
        }
    }

    /// Writes `block` back if it is cached and dirty.
    /// Returns true if the block was cached.
    pub fn flush_block(&self, block: &Block) -> Result<bool> {
        let mut state = self.state.lock();
        match state.cache.peek_mut(block) {
            Some(frame) => {
                self.write_back(block, frame)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes back every dirty frame.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        for (block, frame) in state.cache.iter_mut() {
            self.write_back(block, frame)?;
        }
        Ok(())
    }

    /// Flushes every dirty frame, returns all frames to the free list and
    /// syncs the underlying files.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        for (block, frame) in state.cache.iter_mut() {
            self.write_back(block, frame)?;
        }

        let PoolState { cache, free_list } = &mut *state;
        for (_, mut frame) in cache.drain() {
            frame.reset();
            free_list.push_back(frame);
        }
        drop(state);

        self.file_manager.sync()
    }

    /// Extends `filename` by one block.
    pub fn append_block(&self, filename: &str) -> Result<Block> {
        self.file_manager.append(filename)
    }

    /// Returns the number of blocks in `filename`.
    pub fn block_count(&self, filename: &str) -> Result<u32> {
        self.file_manager.block_count(filename)
    }

    /// Returns the pin count of `block`, or None if it is not cached.
    pub fn pin_count(&self, block: &Block) -> Option<u32> {
        self.state.lock().cache.peek(block).map(|f| f.pin_count())
    }

    /// Returns whether `block` is dirty, or None if it is not cached.
    pub fn is_dirty(&self, block: &Block) -> Option<bool> {
        self.state.lock().cache.peek(block).map(|f| f.is_dirty())
    }

    pub fn is_cached(&self, block: &Block) -> bool {
        self.state.lock().cache.contains(block)
    }

    /// Returns the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Returns the number of frames bound to a block.
    pub fn cached_block_count(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn hits(&self) -> u64 {
        self.state.lock().cache.hits()
    }

    pub fn misses(&self) -> u64 {
        self.state.lock().cache.misses()
    }

    /// Percentage of pins served from memory.
    pub fn hit_ratio(&self) -> f64 {
        self.state.lock().cache.hit_ratio()
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.file_manager
    }

    /// Unpins `block`, marking it dirty first if asked to.
    pub(crate) fn release(&self, block: &Block, dirty: bool) {
        let mut state = self.state.lock();
        if let Some(frame) = state.cache.peek_mut(block) {
            if dirty {
                frame.set_dirty(true);
            }
            let pins = frame.unpin();
            trace!(block = %block, ?pins, dirty, "unpinned");
        }
    }

    /// Gets a free frame, either from the free list or by evicting a block.
    fn take_frame(&self, state: &mut PoolState) -> Result<Frame> {
        if let Some(frame) = state.free_list.pop_front() {
            return Ok(frame);
        }

        let victim = state
            .cache
            .find_victim()
            .ok_or(StorageError::BufferPoolExhausted)?;

        // write back before unbinding so a failed write leaves the pool intact
        if let Some(frame) = state.cache.peek_mut(&victim) {
            self.write_back(&victim, frame)?;
        }

        let mut frame = state
            .cache
            .remove(&victim)
            .ok_or_else(|| StorageError::BlockNotCached(victim.clone()))?;
        debug!(block = %victim, frame = frame.frame_id().as_u32(), "evicting");
        frame.reset();
        Ok(frame)
    }

    fn write_back(&self, block: &Block, frame: &mut Frame) -> Result<()> {
        if frame.is_dirty() {
            let page = frame.page();
            self.file_manager.write(block, &page.read())?;
            frame.set_dirty(false);
            debug!(block = %block, "flushed");
        }
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let _ = self.flush_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_pool(pool_size: usize) -> (BufferPool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let fm = Arc::new(FileManager::new(temp_dir.path()).unwrap());
        let pool = BufferPool::new(pool_size, 2, fm);
        (pool, temp_dir)
    }

    #[test]
    fn test_buffer_pool_new() {
        let (pool, _temp) = create_pool(10);
        assert_eq!(pool.pool_size(), 10);
        assert_eq!(pool.free_frame_count(), 10);
        assert_eq!(pool.cached_block_count(), 0);
    }

    #[test]
    fn test_buffer_pool_pin_unpin() {
        let (pool, _temp) = create_pool(10);
        let block = pool.append_block("t.tbl").unwrap();

        pool.pin_block(&block).unwrap();
        pool.pin_block(&block).unwrap();
        assert_eq!(pool.pin_count(&block), Some(2));
        assert_eq!(pool.free_frame_count(), 9);

        pool.unpin_block(&block);
        pool.unpin_block(&block);
        pool.unpin_block(&block);
        assert_eq!(pool.pin_count(&block), Some(0));

        // unknown block is a no-op
        pool.unpin_block(&Block::new("t.tbl", 42));
        assert_eq!(pool.hits(), 1);
        assert_eq!(pool.misses(), 1);
    }

    #[test]
    fn test_buffer_pool_mark_dirty_and_flush() {
        let (pool, _temp) = create_pool(4);
        let block = pool.append_block("t.tbl").unwrap();

        let page = pool.pin_block(&block).unwrap();
        page.write().set_int(0, 1234).unwrap();
        pool.mark_dirty_block(&block).unwrap();
        assert_eq!(pool.is_dirty(&block), Some(true));

        assert!(pool.flush_block(&block).unwrap());
        assert_eq!(pool.is_dirty(&block), Some(false));
        pool.unpin_block(&block);

        let mut on_disk = crate::storage::page::Page::new();
        pool.file_manager().read(&block, &mut on_disk).unwrap();
        assert_eq!(on_disk.get_int(0).unwrap(), 1234);

        assert!(matches!(
            pool.mark_dirty_block(&Block::new("t.tbl", 9)),
            Err(StorageError::BlockNotCached(_))
        ));
        assert!(!pool.flush_block(&Block::new("t.tbl", 9)).unwrap());
    }

    #[test]
    fn test_buffer_pool_exhausted() {
        let (pool, _temp) = create_pool(2);
        let b0 = pool.append_block("t.tbl").unwrap();
        let b1 = pool.append_block("t.tbl").unwrap();
        let b2 = pool.append_block("t.tbl").unwrap();

        pool.pin_block(&b0).unwrap();
        pool.pin_block(&b1).unwrap();
        assert!(matches!(
            pool.pin_block(&b2),
            Err(StorageError::BufferPoolExhausted)
        ));
        assert_eq!(pool.cached_block_count(), 2);
    }

    #[test]
    fn test_buffer_pool_evicts_dirty_victim() {
        let (pool, _temp) = create_pool(1);
        let b0 = pool.append_block("t.tbl").unwrap();
        let b1 = pool.append_block("t.tbl").unwrap();

        {
            let mut pinned = pool.pin(&b0).unwrap();
            pinned.write().set_int(8, 77).unwrap();
        }
        assert_eq!(pool.is_dirty(&b0), Some(true));

        pool.pin_block(&b1).unwrap();
        assert!(!pool.is_cached(&b0));
        pool.unpin_block(&b1);

        let page = pool.pin_block(&b0).unwrap();
        assert_eq!(page.read().get_int(8).unwrap(), 77);
    }

    #[test]
    fn test_buffer_pool_close_resets_frames() {
        let (pool, _temp) = create_pool(3);
        let block = pool.append_block("t.tbl").unwrap();
        {
            let mut pinned = pool.pin(&block).unwrap();
            pinned.write().set_int(0, 5).unwrap();
        }

        pool.close().unwrap();
        assert_eq!(pool.free_frame_count(), 3);
        assert_eq!(pool.cached_block_count(), 0);

        let page = pool.pin_block(&block).unwrap();
        assert_eq!(page.read().get_int(0).unwrap(), 5);
    }
}
