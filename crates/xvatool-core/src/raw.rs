//! Raw disk image input.
//!
//! Opens a raw image with memory-mapped I/O and derives its occupied
//! extents by scanning for non-zero chunk-sized blocks, so fully zero
//! regions of the image never reach the archive.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::sparse::{Extent, SparseContent, CHUNK_SIZE};

/// A memory-mapped raw disk image.
///
/// The whole file is the virtual disk content. Occupancy is detected at
/// open time: consecutive non-zero 1 MiB blocks are merged into one
/// extent, and all-zero blocks become holes.
pub struct RawDisk {
    mmap: Option<Mmap>,
    len: u64,
    extents: Vec<Extent>,
    path: PathBuf,
}

impl RawDisk {
    /// Opens a raw image and scans it for occupied extents.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let len = file.metadata().map_err(|e| Error::io(e, path))?.len();

        // mmap rejects zero-length files
        if len == 0 {
            return Ok(Self {
                mmap: None,
                len: 0,
                extents: Vec::new(),
                path: path.to_path_buf(),
            });
        }

        // Safety: read-only mapping of a file we just opened; the map
        // lives as long as this struct.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| Error::io(e, path))? };
        let extents = scan_extents(&mmap);

        Ok(Self {
            mmap: Some(mmap),
            len,
            extents,
            path: path.to_path_buf(),
        })
    }

    /// Path the image was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total bytes inside occupied extents.
    pub fn occupied_bytes(&self) -> u64 {
        self.extents.iter().map(|e| e.length).sum()
    }

    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

/// Merge consecutive non-zero chunk-sized blocks into extents.
fn scan_extents(data: &[u8]) -> Vec<Extent> {
    let len = data.len() as u64;
    let mut extents = Vec::new();
    let mut run_start: Option<u64> = None;

    let mut offset = 0u64;
    while offset < len {
        let end = (offset + CHUNK_SIZE).min(len);
        let occupied = data[offset as usize..end as usize].iter().any(|&b| b != 0);

        if occupied {
            run_start.get_or_insert(offset);
        } else if let Some(start) = run_start.take() {
            extents.push(Extent::new(start, offset - start));
        }
        offset = end;
    }

    if let Some(start) = run_start {
        extents.push(Extent::new(start, len - start));
    }

    extents
}

impl SparseContent for RawDisk {
    fn len(&self) -> u64 {
        self.len
    }

    fn extents(&self) -> &[Extent] {
        &self.extents
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let data = self.data();
        let end = offset
            .checked_add(buf.len() as u64)
            .filter(|&end| end <= data.len() as u64)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of image")
            })?;
        buf.copy_from_slice(&data[offset as usize..end as usize]);
        Ok(())
    }
}
