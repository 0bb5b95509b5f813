//! Sparse disk content abstraction.
//!
//! A disk exposes its total virtual length, the list of byte ranges that
//! actually hold data, and random-access reads. Byte ranges outside all
//! extents are logical zeros; the export pipeline never reads a chunk
//! that no extent touches.

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Fixed chunk size used to partition disk content (1 MiB).
pub const CHUNK_SIZE: u64 = 1024 * 1024;

/// A half-open byte range `[start, start + length)` of a disk that holds
/// actual data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// Byte offset of the first occupied byte.
    pub start: u64,
    /// Number of occupied bytes.
    pub length: u64,
}

impl Extent {
    /// Creates a new extent.
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// The exclusive end offset, or `None` if `start + length` overflows.
    pub fn end(&self) -> Option<u64> {
        self.start.checked_add(self.length)
    }
}

/// Random-access source of sparse disk content.
///
/// Implementations own the backing data; the builder only borrows them
/// for the duration of a build. The extent list must be ascending and
/// non-overlapping, and reads inside the disk but outside any extent
/// must yield zeros.
pub trait SparseContent {
    /// Total virtual length of the disk in bytes.
    fn len(&self) -> u64;

    /// Whether the disk has zero virtual length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupied extents in ascending, non-overlapping order.
    fn extents(&self) -> &[Extent];

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// The requested range must lie within the disk.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// Validate that an extent list is well-formed for a disk of `len` bytes:
/// ascending, non-overlapping, non-empty lengths, no offset overflow,
/// nothing past the end of the disk.
///
/// The chunker's deduplication guard only compares against the most
/// recently emitted chunk index, which is correct exactly under these
/// preconditions, so they are enforced loudly here instead of being
/// silently assumed.
pub fn validate_extents(extents: &[Extent], len: u64) -> Result<()> {
    let mut prev_end = 0u64;
    for (i, extent) in extents.iter().enumerate() {
        if extent.length == 0 {
            return Err(Error::invalid_extent(format!("extent {i} has zero length")));
        }
        let end = extent.end().ok_or_else(|| {
            Error::invalid_extent(format!("extent {i} overflows a 64-bit offset"))
        })?;
        if extent.start < prev_end {
            return Err(Error::invalid_extent(format!(
                "extent {i} is unsorted or overlaps its predecessor"
            )));
        }
        if end > len {
            return Err(Error::invalid_extent(format!(
                "extent {i} ends at {end}, beyond disk length {len}"
            )));
        }
        prev_end = end;
    }
    Ok(())
}

/// In-memory sparse disk backed by a byte buffer.
///
/// Useful for tests and for exporting small images that are already in
/// memory. The buffer holds the full virtual content, zeros included;
/// the extent list only marks which ranges count as occupied.
pub struct MemoryDisk {
    data: Vec<u8>,
    extents: Vec<Extent>,
}

impl MemoryDisk {
    /// Creates a disk from raw content and its occupied extents.
    pub fn new(data: Vec<u8>, extents: Vec<Extent>) -> Self {
        Self { data, extents }
    }

    /// Creates a disk whose entire content is one occupied extent.
    pub fn dense(data: Vec<u8>) -> Self {
        let extents = if data.is_empty() {
            Vec::new()
        } else {
            vec![Extent::new(0, data.len() as u64)]
        };
        Self { data, extents }
    }
}

impl SparseContent for MemoryDisk {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn extents(&self) -> &[Extent] {
        &self.extents
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .filter(|&end| end <= self.data.len() as u64)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of disk")
            })?;
        buf.copy_from_slice(&self.data[offset as usize..end as usize]);
        Ok(())
    }
}

/// Positional [`Read`] adapter over one chunk's byte range of a disk.
///
/// Serves exactly `length` bytes starting at `offset`, then reports end
/// of stream.
pub struct ChunkReader<'a> {
    content: &'a dyn SparseContent,
    offset: u64,
    remaining: u64,
}

impl<'a> ChunkReader<'a> {
    /// Creates a reader over `[offset, offset + length)` of `content`.
    pub fn new(content: &'a dyn SparseContent, offset: u64, length: u64) -> Self {
        Self {
            content,
            offset,
            remaining: length,
        }
    }
}

impl Read for ChunkReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        self.content.read_at(self.offset, &mut buf[..n])?;
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_validate_accepts_sorted_extents() {
        let extents = vec![Extent::new(0, 100), Extent::new(100, 50), Extent::new(400, 1)];
        assert!(validate_extents(&extents, 1024).is_ok());
    }

    #[test]
    fn test_validate_accepts_empty_list() {
        assert!(validate_extents(&[], 0).is_ok());
        assert!(validate_extents(&[], 1024).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_length() {
        let extents = vec![Extent::new(10, 0)];
        assert!(validate_extents(&extents, 1024).is_err());
    }

    #[test]
    fn test_validate_rejects_overflow() {
        let extents = vec![Extent::new(u64::MAX - 1, 2)];
        assert!(validate_extents(&extents, u64::MAX).is_err());
    }

    #[test]
    fn test_validate_rejects_unsorted() {
        let extents = vec![Extent::new(100, 10), Extent::new(0, 10)];
        assert!(validate_extents(&extents, 1024).is_err());
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let extents = vec![Extent::new(0, 100), Extent::new(50, 100)];
        assert!(validate_extents(&extents, 1024).is_err());
    }

    #[test]
    fn test_validate_rejects_past_end() {
        let extents = vec![Extent::new(0, 2048)];
        assert!(validate_extents(&extents, 1024).is_err());
    }

    #[test]
    fn test_memory_disk_dense() {
        let disk = MemoryDisk::dense(vec![7u8; 256]);
        assert_eq!(disk.len(), 256);
        assert_eq!(disk.extents(), &[Extent::new(0, 256)]);
    }

    #[test]
    fn test_memory_disk_dense_empty() {
        let disk = MemoryDisk::dense(Vec::new());
        assert!(disk.is_empty());
        assert!(disk.extents().is_empty());
    }

    #[test]
    fn test_memory_disk_read_at() {
        let data: Vec<u8> = (0..=255).collect();
        let disk = MemoryDisk::dense(data);
        let mut buf = [0u8; 4];
        disk.read_at(10, &mut buf).unwrap();
        assert_eq!(buf, [10, 11, 12, 13]);
    }

    #[test]
    fn test_memory_disk_read_past_end() {
        let disk = MemoryDisk::dense(vec![0u8; 16]);
        let mut buf = [0u8; 4];
        assert!(disk.read_at(14, &mut buf).is_err());
    }

    #[test]
    fn test_chunk_reader_exact_window() {
        let data: Vec<u8> = (0..100u8).collect();
        let disk = MemoryDisk::dense(data);
        let mut reader = ChunkReader::new(&disk, 20, 10);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, (20..30u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunk_reader_eof_after_window() {
        let disk = MemoryDisk::dense(vec![1u8; 64]);
        let mut reader = ChunkReader::new(&disk, 0, 8);
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 8);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
