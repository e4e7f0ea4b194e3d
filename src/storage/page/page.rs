use xxhash_rust::xxh64::Xxh64;

use crate::common::{Result, StorageError, PAGE_DATA_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE};

/// Page layout:
///
/// +---------------------+  0
/// | checksum (u64)      |
/// +---------------------+  8
/// | page id (u32)       |
/// +---------------------+  12
/// | page type (u8)      |
/// | reserved (3)        |
/// +---------------------+  16
/// | record count (u32)  |
/// +---------------------+  20
/// | free space ptr (u32)|
/// +---------------------+  24
/// | reserved (8)        |
/// +---------------------+  32
/// | data region         |
/// | ...                 |
/// +---------------------+  4096
///
/// Data offsets passed to the accessors are relative to the data region.
/// The checksum covers every byte except the checksum field itself.
const CHECKSUM_OFFSET: usize = 0;
const PAGE_ID_OFFSET: usize = 8;
const PAGE_TYPE_OFFSET: usize = 12;
const RECORD_COUNT_OFFSET: usize = 16;
const FREE_SPACE_POINTER_OFFSET: usize = 20;

/// Size of the length prefix written by `set_bytes`/`set_string`
const LENGTH_PREFIX_SIZE: usize = 4;

/// What a page currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    /// Never formatted (all zero on disk)
    Free = 0,
    /// Slotted record page
    Record = 1,
}

impl PageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PageType::Free),
            1 => Some(PageType::Record),
            _ => None,
        }
    }
}

/// In-memory image of one block.
#[derive(Clone)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.page_id())
            .field("page_type", &self.page_type())
            .field("record_count", &self.record_count())
            .field("free_space_pointer", &self.free_space_pointer())
            .finish()
    }
}

impl Page {
    /// Creates a zero-filled page.
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Returns the full page image, header included.
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Mutable access to the full page image for block reads.
    /// The checksum is not recomputed.
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    /// Replaces the page image with a copy of `bytes` and reseals it.
    pub fn copy_from(&mut self, bytes: &[u8; PAGE_SIZE]) {
        self.data.copy_from_slice(bytes);
        self.update_checksum();
    }

    /// Zeroes the whole page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Returns the capacity of the data region.
    pub fn capacity(&self) -> usize {
        PAGE_DATA_SIZE
    }

    // ----- header -----

    fn header_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap())
    }

    fn set_header_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self.update_checksum();
    }

    pub fn page_id(&self) -> u32 {
        self.header_u32(PAGE_ID_OFFSET)
    }

    pub fn set_page_id(&mut self, page_id: u32) {
        self.set_header_u32(PAGE_ID_OFFSET, page_id);
    }

    /// Returns the page type, treating unknown tags as `Free`.
    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[PAGE_TYPE_OFFSET]).unwrap_or(PageType::Free)
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.data[PAGE_TYPE_OFFSET] = page_type as u8;
        self.update_checksum();
    }

    /// Number of slot directory entries, deleted slots included.
    pub fn record_count(&self) -> u32 {
        self.header_u32(RECORD_COUNT_OFFSET)
    }

    pub fn set_record_count(&mut self, count: u32) {
        self.set_header_u32(RECORD_COUNT_OFFSET, count);
    }

    /// Data offset where the record heap currently starts.
    pub fn free_space_pointer(&self) -> u32 {
        self.header_u32(FREE_SPACE_POINTER_OFFSET)
    }

    pub fn set_free_space_pointer(&mut self, pointer: u32) -> Result<()> {
        if pointer as usize > PAGE_DATA_SIZE {
            return Err(StorageError::InvalidFreeSpacePointer(pointer));
        }
        self.set_header_u32(FREE_SPACE_POINTER_OFFSET, pointer);
        Ok(())
    }

    // ----- checksum -----

    /// Hashes the page, skipping the checksum field.
    pub fn compute_checksum(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        hasher.update(&self.data[CHECKSUM_OFFSET + 8..PAGE_SIZE]);
        hasher.digest()
    }

    /// Returns the stored checksum.
    pub fn checksum(&self) -> u64 {
        u64::from_le_bytes(self.data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 8].try_into().unwrap())
    }

    /// Recomputes the checksum and writes it into the header.
    pub fn update_checksum(&mut self) {
        let checksum = self.compute_checksum();
        self.data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 8].copy_from_slice(&checksum.to_le_bytes());
    }

    /// Returns true if the stored checksum matches the contents.
    /// A never-written page (all zero) is valid.
    pub fn verify_checksum(&self) -> bool {
        if self.data.iter().all(|&b| b == 0) {
            return true;
        }
        self.checksum() == self.compute_checksum()
    }

    // ----- data region -----

    /// Maps a data offset range onto the page, failing past capacity.
    fn data_range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= PAGE_DATA_SIZE => {
                Ok(PAGE_HEADER_SIZE + offset..PAGE_HEADER_SIZE + end)
            }
            _ => Err(StorageError::PageBoundary {
                offset,
                len,
                capacity: PAGE_DATA_SIZE,
            }),
        }
    }

    /// Reads a little-endian i32 at a data offset.
    pub fn get_int(&self, offset: usize) -> Result<i32> {
        let range = self.data_range(offset, 4)?;
        Ok(i32::from_le_bytes(self.data[range].try_into().unwrap()))
    }

    /// Writes a little-endian i32 at a data offset.
    pub fn set_int(&mut self, offset: usize, value: i32) -> Result<()> {
        let range = self.data_range(offset, 4)?;
        self.data[range].copy_from_slice(&value.to_le_bytes());
        self.update_checksum();
        Ok(())
    }

    /// Reads a length-prefixed byte string at a data offset.
    pub fn get_bytes(&self, offset: usize) -> Result<Vec<u8>> {
        let len = self.get_int(offset)?;
        if len < 0 {
            return Err(StorageError::PageBoundary {
                offset,
                len: 0,
                capacity: PAGE_DATA_SIZE,
            });
        }
        let range = self.data_range(offset + LENGTH_PREFIX_SIZE, len as usize)?;
        Ok(self.data[range].to_vec())
    }

    /// Writes a 4-byte length prefix followed by `bytes` at a data offset.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        // check the whole write before touching the page
        let range = self.data_range(offset, Self::max_bytes_len(bytes.len()))?;
        let body = range.start + LENGTH_PREFIX_SIZE;
        self.data[range.start..body].copy_from_slice(&(bytes.len() as i32).to_le_bytes());
        self.data[body..range.end].copy_from_slice(bytes);
        self.update_checksum();
        Ok(())
    }

    /// Reads a length-prefixed ISO-8859-1 string at a data offset.
    pub fn get_string(&self, offset: usize) -> Result<String> {
        Ok(decode_latin1(&self.get_bytes(offset)?))
    }

    /// Writes a length-prefixed ISO-8859-1 string at a data offset.
    pub fn set_string(&mut self, offset: usize, value: &str) -> Result<()> {
        self.set_bytes(offset, &encode_latin1(value))
    }

    /// Bytes occupied by a length-prefixed value of `len` bytes.
    pub fn max_bytes_len(len: usize) -> usize {
        LENGTH_PREFIX_SIZE + len
    }

    /// Bytes occupied by `value` when written with `set_string`.
    pub fn max_string_len(value: &str) -> usize {
        Self::max_bytes_len(value.chars().count())
    }

    /// Borrows `len` raw bytes at a data offset.
    pub fn read_raw(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.data_range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Copies raw bytes into the data region.
    pub fn write_raw(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = self.data_range(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        self.update_checksum();
        Ok(())
    }
}

/// Encodes a string with one byte per character. Characters outside
/// ISO-8859-1 become `?`.
pub fn encode_latin1(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

/// Decodes ISO-8859-1 bytes.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
