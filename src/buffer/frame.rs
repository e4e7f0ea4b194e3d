use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Block, FrameId};
use crate::storage::page::Page;

use super::Evictable;

/// Shared handle to the page held by a frame.
pub type PageRef = Arc<RwLock<Page>>;

/// Frame is one buffer pool slot. It binds a page to at most one block
/// and tracks how many callers have it pinned and whether it was modified.
pub struct Frame {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// The block whose contents the page holds, None while the frame is free
    block: Option<Block>,
    /// The page data
    page: PageRef,
    /// Number of outstanding pins
    pin_count: u32,
    /// Whether the page has been modified since being read from disk
    dirty: bool,
}

impl Frame {
    /// Creates an empty frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            block: None,
            page: Arc::new(RwLock::new(Page::new())),
            pin_count: 0,
            dirty: false,
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the block this frame holds.
    pub fn block(&self) -> Option<&Block> {
        self.block.as_ref()
    }

    /// Returns a handle to the frame's page.
    pub fn page(&self) -> PageRef {
        Arc::clone(&self.page)
    }

    /// Binds the frame to `block`. The page must already hold its contents.
    pub fn assign(&mut self, block: Block) {
        self.block = Some(block);
        self.dirty = false;
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Increments the pin count and returns the new value.
    pub fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Decrements the pin count and returns the new value.
    /// Returns None if the pin count was already 0.
    pub fn unpin(&mut self) -> Option<u32> {
        if self.pin_count == 0 {
            return None;
        }
        self.pin_count -= 1;
        Some(self.pin_count)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Resets the frame to its initial state.
    ///
    /// The page is zeroed in place unless a stale handle to it is still
    /// alive, in which case the frame gets a fresh page.
    pub fn reset(&mut self) {
        self.block = None;
        self.pin_count = 0;
        self.dirty = false;
        if Arc::strong_count(&self.page) == 1 {
            self.page.write().reset();
        } else {
            self.page = Arc::new(RwLock::new(Page::new()));
        }
    }
}

impl Evictable for Frame {
    fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new(FrameId::new(3));
        assert_eq!(frame.frame_id(), FrameId::new(3));
        assert!(frame.block().is_none());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_frame_pin_unpin() {
        let mut frame = Frame::new(FrameId::new(0));
        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert!(frame.is_pinned());

        assert_eq!(frame.unpin(), Some(1));
        assert_eq!(frame.unpin(), Some(0));
        assert_eq!(frame.unpin(), None);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_frame_reset() {
        let mut frame = Frame::new(FrameId::new(0));
        frame.assign(Block::new("t.tbl", 2));
        frame.pin();
        frame.set_dirty(true);
        frame.page().write().set_int(0, 99).unwrap();

        frame.reset();
        assert!(frame.block().is_none());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.page().read().get_int(0).unwrap(), 0);
    }

    #[test]
    fn test_frame_reset_detaches_stale_handles() {
        let mut frame = Frame::new(FrameId::new(0));
        let stale = frame.page();
        stale.write().set_int(0, 5).unwrap();

        frame.reset();
        assert_eq!(stale.read().get_int(0).unwrap(), 5);
        assert!(!Arc::ptr_eq(&stale, &frame.page()));
    }
}
