use std::fmt;
use std::sync::Arc;

/// Identifies one fixed-size block of a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block {
    filename: Arc<str>,
    block_num: u32,
}

impl Block {
    pub fn new(filename: impl Into<Arc<str>>, block_num: u32) -> Self {
        Self {
            filename: filename.into(),
            block_num,
        }
    }

    /// Returns the name of the file this block belongs to.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the block number within the file.
    pub fn block_num(&self) -> u32 {
        self.block_num
    }

    /// Returns the byte offset of this block in its file.
    pub fn file_offset(&self, page_size: usize) -> u64 {
        self.block_num as u64 * page_size as u64
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.filename, self.block_num)
    }
}

/// Frame identifier type - identifies a buffer frame in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

/// Record identifier - the block holding a record and its slot number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub block: Block,
    pub slot: u32,
}

impl RecordId {
    pub fn new(block: Block, slot: u32) -> Self {
        Self { block, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.slot)
    }
}

/// Logical timestamp type for LRU-K tracking
pub type Timestamp = u64;
