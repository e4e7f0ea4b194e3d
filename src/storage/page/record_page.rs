use tracing::debug;

use crate::common::{
    Result, StorageError, DELETE_COMPACTION_THRESHOLD, INSERT_COMPACTION_THRESHOLD,
    PAGE_DATA_SIZE, SLOT_SIZE,
};
use crate::record::{Record, Schema};

use super::{Page, PageType};

/// Record page layout, inside the page's data region:
///
/// +------------------+  0
/// | Slot Directory   |  (grows forward)
/// | [slot 0]         |
/// | [slot 1]         |
/// | ...              |
/// +------------------+  record_count * SLOT_SIZE
/// |                  |
/// | Free Space       |
/// |                  |
/// +------------------+  free_space_pointer
/// | Record Heap      |  (grows backward from the end)
/// | [record n]       |
/// | ...              |
/// | [record 0]       |
/// +------------------+  PAGE_DATA_SIZE
///
/// Each slot entry is { offset: i32, length: i32 }. An offset of -1 marks a
/// deleted slot. Slots are never reused, so a live record keeps its slot
/// number for its whole life, compaction included.
const DELETED_OFFSET: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotEntry {
    offset: i32,
    length: i32,
}

impl SlotEntry {
    const DELETED: SlotEntry = SlotEntry {
        offset: DELETED_OFFSET,
        length: 0,
    };

    fn is_deleted(&self) -> bool {
        self.offset == DELETED_OFFSET
    }
}

/// Read-only view of a record page.
pub struct RecordPageRef<'a> {
    page: &'a Page,
    schema: &'a Schema,
}

impl<'a> RecordPageRef<'a> {
    /// Creates a read-only view. An unformatted page reads as empty.
    pub fn new(page: &'a Page, schema: &'a Schema) -> Self {
        Self { page, schema }
    }

    fn is_formatted(&self) -> bool {
        self.page.page_type() == PageType::Record
    }

    /// Number of slots in the directory, deleted ones included.
    pub fn record_count(&self) -> u32 {
        if self.is_formatted() {
            self.page.record_count()
        } else {
            0
        }
    }

    /// Number of slots holding a record.
    pub fn live_count(&self) -> u32 {
        self.record_count() - self.deleted_count()
    }

    /// Number of deleted slots.
    pub fn deleted_count(&self) -> u32 {
        (0..self.record_count())
            .filter(|&slot| matches!(self.slot(slot), Ok(entry) if entry.is_deleted()))
            .count() as u32
    }

    /// Fraction of directory slots that are deleted.
    pub fn fragmentation_ratio(&self) -> f64 {
        let total = self.record_count();
        if total == 0 {
            return 0.0;
        }
        self.deleted_count() as f64 / total as f64
    }

    /// Bytes between the end of the slot directory and the record heap.
    pub fn free_space(&self) -> usize {
        if !self.is_formatted() {
            return PAGE_DATA_SIZE;
        }
        (self.page.free_space_pointer() as usize).saturating_sub(self.slot_directory_end())
    }

    fn slot_directory_end(&self) -> usize {
        self.record_count() as usize * SLOT_SIZE
    }

    fn slot(&self, slot: u32) -> Result<SlotEntry> {
        let base = slot as usize * SLOT_SIZE;
        Ok(SlotEntry {
            offset: self.page.get_int(base)?,
            length: self.page.get_int(base + 4)?,
        })
    }

    /// Returns the slot entry of a live record.
    fn live_slot(&self, slot: u32) -> Result<SlotEntry> {
        if slot >= self.record_count() {
            return Err(StorageError::SlotNotFound(slot));
        }
        let entry = self.slot(slot)?;
        if entry.is_deleted() {
            return Err(StorageError::SlotNotFound(slot));
        }
        Ok(entry)
    }

    fn record_bytes(&self, entry: SlotEntry) -> Result<&'a [u8]> {
        self.page
            .read_raw(entry.offset as usize, entry.length as usize)
    }

    /// Returns the record in `slot`, or None if it is deleted or out of range.
    pub fn get_record(&self, slot: u32) -> Result<Option<Record>> {
        match self.live_slot(slot) {
            Ok(entry) => {
                let bytes = self.record_bytes(entry)?;
                Ok(Some(Record::from_bytes(self.schema, bytes)?))
            }
            Err(StorageError::SlotNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns every live record with its slot number, in slot order.
    pub fn get_all_records(&self) -> Result<Vec<(u32, Record)>> {
        let mut records = Vec::new();
        for slot in 0..self.record_count() {
            if let Some(record) = self.get_record(slot)? {
                records.push((slot, record));
            }
        }
        Ok(records)
    }
}

/// RecordPage interprets a page as a slotted page of records
/// serialized under one schema.
pub struct RecordPage<'a> {
    page: &'a mut Page,
    schema: &'a Schema,
}

impl<'a> RecordPage<'a> {
    /// Creates a record page view, formatting the page if it was never used.
    pub fn new(page: &'a mut Page, schema: &'a Schema) -> Result<Self> {
        if page.page_type() == PageType::Free {
            page.set_page_type(PageType::Record);
            page.set_record_count(0);
            page.set_free_space_pointer(PAGE_DATA_SIZE as u32)?;
        }

        let fsp = page.free_space_pointer();
        let directory_end = page.record_count() as usize * SLOT_SIZE;
        if (fsp as usize) < directory_end || fsp as usize > PAGE_DATA_SIZE {
            return Err(StorageError::InvalidFreeSpacePointer(fsp));
        }

        Ok(Self { page, schema })
    }

    /// Read-only view over the same page.
    pub fn view(&self) -> RecordPageRef<'_> {
        RecordPageRef::new(self.page, self.schema)
    }

    pub fn record_count(&self) -> u32 {
        self.page.record_count()
    }

    pub fn live_count(&self) -> u32 {
        self.view().live_count()
    }

    pub fn deleted_count(&self) -> u32 {
        self.view().deleted_count()
    }

    pub fn fragmentation_ratio(&self) -> f64 {
        self.view().fragmentation_ratio()
    }

    pub fn free_space(&self) -> usize {
        self.view().free_space()
    }

    pub fn get_record(&self, slot: u32) -> Result<Option<Record>> {
        self.view().get_record(slot)
    }

    pub fn get_all_records(&self) -> Result<Vec<(u32, Record)>> {
        self.view().get_all_records()
    }

    /// Inserts a record into a new slot and returns the slot number.
    ///
    /// A page that cannot fit the record is compacted first when more than
    /// a fifth of its slots are deleted.
    pub fn insert(&mut self, record: &Record) -> Result<u32> {
        let bytes = record.to_bytes(self.schema)?;
        let required = bytes.len() + SLOT_SIZE;

        if self.free_space() < required
            && self.fragmentation_ratio() > INSERT_COMPACTION_THRESHOLD
        {
            self.compact()?;
        }
        if self.free_space() < required {
            return Err(StorageError::InsufficientSpace {
                required,
                available: self.free_space(),
            });
        }

        let slot = self.page.record_count();
        let offset = self.push_heap(&bytes)?;
        self.page.set_record_count(slot + 1);
        self.set_slot(
            slot,
            SlotEntry {
                offset,
                length: bytes.len() as i32,
            },
        )?;

        Ok(slot)
    }

    /// Replaces the record in `slot`. The slot number never changes.
    ///
    /// A record that no longer fits its old space moves to a new heap
    /// position, compacting the page if that is the only way to make room.
    /// On failure the old record is left in place.
    pub fn update(&mut self, slot: u32, record: &Record) -> Result<()> {
        let entry = self.view().live_slot(slot)?;
        let bytes = record.to_bytes(self.schema)?;

        if bytes.len() <= entry.length as usize {
            self.page.write_raw(entry.offset as usize, &bytes)?;
            return self.set_slot(
                slot,
                SlotEntry {
                    offset: entry.offset,
                    length: bytes.len() as i32,
                },
            );
        }

        if self.free_space() < bytes.len() {
            // release the old copy so compaction can reclaim its bytes too
            let old = self.view().record_bytes(entry)?.to_vec();
            self.set_slot(slot, SlotEntry::DELETED)?;
            self.compact()?;

            if self.free_space() < bytes.len() {
                let offset = self.push_heap(&old)?;
                self.set_slot(
                    slot,
                    SlotEntry {
                        offset,
                        length: old.len() as i32,
                    },
                )?;
                return Err(StorageError::InsufficientSpace {
                    required: bytes.len(),
                    available: self.free_space(),
                });
            }
        }

        let offset = self.push_heap(&bytes)?;
        self.set_slot(
            slot,
            SlotEntry {
                offset,
                length: bytes.len() as i32,
            },
        )
    }

    /// Deletes the record in `slot`. The page is compacted once more than
    /// 30% of its slots are deleted.
    pub fn delete(&mut self, slot: u32) -> Result<()> {
        self.view().live_slot(slot)?;
        self.set_slot(slot, SlotEntry::DELETED)?;

        if self.record_count() > 2 && self.fragmentation_ratio() > DELETE_COMPACTION_THRESHOLD {
            self.compact()?;
        }
        Ok(())
    }

    /// Re-packs live records against the end of the page. Slot numbers and
    /// the record count are unchanged.
    pub fn compact(&mut self) -> Result<()> {
        let before = self.free_space();

        let mut live = Vec::new();
        for slot in 0..self.record_count() {
            let entry = self.view().slot(slot)?;
            if !entry.is_deleted() {
                live.push((slot, self.view().record_bytes(entry)?.to_vec()));
            }
        }

        self.page.set_free_space_pointer(PAGE_DATA_SIZE as u32)?;
        for (slot, bytes) in &live {
            let offset = self.push_heap(bytes)?;
            self.set_slot(
                *slot,
                SlotEntry {
                    offset,
                    length: bytes.len() as i32,
                },
            )?;
        }

        debug!(
            live = live.len(),
            reclaimed = self.free_space() - before,
            "compacted record page"
        );
        Ok(())
    }

    /// Writes `bytes` just below the heap start and moves the free space
    /// pointer down over them.
    fn push_heap(&mut self, bytes: &[u8]) -> Result<i32> {
        let fsp = self.page.free_space_pointer() as usize;
        let offset = fsp
            .checked_sub(bytes.len())
            .filter(|&offset| offset >= self.view().slot_directory_end())
            .ok_or(StorageError::InsufficientSpace {
                required: bytes.len(),
                available: self.free_space(),
            })?;

        self.page.write_raw(offset, bytes)?;
        self.page.set_free_space_pointer(offset as u32)?;
        Ok(offset as i32)
    }

    fn set_slot(&mut self, slot: u32, entry: SlotEntry) -> Result<()> {
        let base = slot as usize * SLOT_SIZE;
        self.page.set_int(base, entry.offset)?;
        self.page.set_int(base + 4, entry.length)
    }
}
