use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{Block, Result, StorageError, PAGE_SIZE, TEMP_FILE_PREFIX};
use crate::storage::page::Page;

/// FileManager reads and writes fixed-size blocks of the files in one data
/// directory. File handles are opened lazily and cached by filename.
///
/// Every call holds a single lock for its whole duration, so reads and writes
/// are totally ordered across all files of the manager.
pub struct FileManager {
    /// Directory holding every file this manager touches
    data_dir: PathBuf,
    /// Open file handles keyed by filename
    open_files: Mutex<HashMap<String, File>>,
    /// Whether page checksums are checked on read
    verify_checksums: bool,
    /// Number of block reads performed
    num_reads: AtomicU64,
    /// Number of block writes performed (appends included)
    num_writes: AtomicU64,
}

impl FileManager {
    /// Opens a file manager over `data_dir`, creating the directory if needed.
    /// Leftover temp files in the directory are deleted.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        Self::with_checksums(data_dir, true)
    }

    /// Like `new`, with explicit control over checksum verification.
    pub fn with_checksums<P: AsRef<Path>>(data_dir: P, verify_checksums: bool) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        for entry in fs::read_dir(&data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(TEMP_FILE_PREFIX) && entry.file_type()?.is_file()
            {
                debug!(file = %name.to_string_lossy(), "purging temp file");
                fs::remove_file(entry.path())?;
            }
        }

        Ok(Self {
            data_dir,
            open_files: Mutex::new(HashMap::new()),
            verify_checksums,
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        })
    }

    /// Reads `block` into `page`. Bytes past the end of the file read as zero.
    pub fn read(&self, block: &Block, page: &mut Page) -> Result<()> {
        let mut files = self.open_files.lock();
        let file = self.file_handle(&mut files, block.filename())?;

        file.seek(SeekFrom::Start(block.file_offset(PAGE_SIZE)))?;
        let buf = page.as_bytes_mut();
        let bytes_read = read_full(file, buf)?;
        if bytes_read < PAGE_SIZE {
            buf[bytes_read..].fill(0);
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);

        if self.verify_checksums && !page.verify_checksum() {
            return Err(StorageError::ChecksumMismatch(block.clone()));
        }
        Ok(())
    }

    /// Writes `page` to `block` under a freshly computed checksum.
    pub fn write(&self, block: &Block, page: &Page) -> Result<()> {
        let checksum = page.compute_checksum().to_le_bytes();
        let mut files = self.open_files.lock();
        let file = self.file_handle(&mut files, block.filename())?;

        // the checksum field leads the page image
        file.seek(SeekFrom::Start(block.file_offset(PAGE_SIZE)))?;
        file.write_all(&checksum)?;
        file.write_all(&page.as_bytes()[checksum.len()..])?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Extends `filename` by one zero-filled block and returns it.
    pub fn append(&self, filename: &str) -> Result<Block> {
        let mut files = self.open_files.lock();
        let file = self.file_handle(&mut files, filename)?;

        let block_num = Self::blocks_in(file)?;
        let block = Block::new(filename, block_num);

        file.seek(SeekFrom::Start(block.file_offset(PAGE_SIZE)))?;
        file.write_all(&[0u8; PAGE_SIZE])?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!(block = %block, "appended block");
        Ok(block)
    }

    /// Returns the number of blocks in `filename`, counting a partial
    /// trailing block as a whole one.
    pub fn block_count(&self, filename: &str) -> Result<u32> {
        let mut files = self.open_files.lock();
        let file = self.file_handle(&mut files, filename)?;
        Self::blocks_in(file)
    }

    /// Flushes every open file to stable storage.
    pub fn sync(&self) -> Result<()> {
        let files = self.open_files.lock();
        for file in files.values() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Syncs and closes all open handles. Files reopen on next use.
    pub fn close(&self) -> Result<()> {
        let mut files = self.open_files.lock();
        for (_, file) in files.drain() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the number of block reads performed.
    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of block writes performed.
    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the cached handle for `filename`, opening it on first use.
    fn file_handle<'a>(
        &self,
        files: &'a mut HashMap<String, File>,
        filename: &str,
    ) -> Result<&'a mut File> {
        if !files.contains_key(filename) {
            let path = self.data_dir.join(filename);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            debug!(path = %path.display(), "opened file");
            files.insert(filename.to_string(), file);
        }
        files
            .get_mut(filename)
            .ok_or_else(|| StorageError::Io(ErrorKind::NotFound.into()))
    }

    fn blocks_in(file: &File) -> Result<u32> {
        let len = file.metadata()?.len();
        Ok(len.div_ceil(PAGE_SIZE as u64) as u32)
    }
}

impl Drop for FileManager {
    fn drop(&mut self) {
        for file in self.open_files.get_mut().values() {
            let _ = file.sync_all();
        }
    }
}

/// Reads until `buf` is full or the file ends, returning the bytes read.
fn read_full(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}
