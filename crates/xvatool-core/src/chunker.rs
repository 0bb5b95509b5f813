//! Extent-to-chunk mapping.
//!
//! Maps a disk's occupied extents to the ordered sequence of 1 MiB chunk
//! indices that need to be emitted into the archive.

use crate::error::Result;
use crate::sparse::{validate_extents, Extent, CHUNK_SIZE};

/// Map occupied extents to the strictly ascending sequence of distinct
/// chunk indices they cover.
///
/// `extents` must be ascending and non-overlapping for a disk of
/// `disk_len` bytes; the list is validated before any index is computed.
/// Under that precondition, two extents can only share the chunk at
/// their boundary, so remembering the single most recently emitted index
/// is enough to deduplicate.
pub fn covered_chunks(extents: &[Extent], disk_len: u64) -> Result<Vec<u64>> {
    validate_extents(extents, disk_len)?;

    let mut chunks = Vec::new();
    let mut last_added: Option<u64> = None;

    for extent in extents {
        let first = extent.start / CHUNK_SIZE;
        // length >= 1 after validation, so this cannot underflow
        let last = (extent.start + extent.length - 1) / CHUNK_SIZE;

        for index in first..=last {
            if last_added != Some(index) {
                chunks.push(index);
                last_added = Some(index);
            }
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_no_extents_no_chunks() {
        assert_eq!(covered_chunks(&[], 10 * MIB).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn test_single_extent_single_chunk() {
        let extents = vec![Extent::new(0, 100)];
        assert_eq!(covered_chunks(&extents, MIB).unwrap(), vec![0]);
    }

    #[test]
    fn test_extent_spanning_chunks() {
        let extents = vec![Extent::new(MIB / 2, 2 * MIB)];
        assert_eq!(covered_chunks(&extents, 4 * MIB).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_adjacent_extents_share_boundary_chunk() {
        // Both extents fall entirely inside chunk 0; it is emitted once.
        let extents = vec![Extent::new(0, 100), Extent::new(100, 100)];
        assert_eq!(covered_chunks(&extents, MIB).unwrap(), vec![0]);
    }

    #[test]
    fn test_extents_meeting_at_chunk_boundary() {
        // First extent ends exactly at the chunk boundary; the second
        // starts there, so no chunk is shared.
        let extents = vec![Extent::new(0, MIB), Extent::new(MIB, MIB)];
        assert_eq!(covered_chunks(&extents, 2 * MIB).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_gap_skips_uncovered_chunks() {
        let extents = vec![Extent::new(0, 100), Extent::new(5 * MIB, 100)];
        assert_eq!(covered_chunks(&extents, 6 * MIB).unwrap(), vec![0, 5]);
    }

    #[test]
    fn test_each_covered_chunk_emitted_once_ascending() {
        let extents = vec![
            Extent::new(0, MIB + 1),
            Extent::new(MIB + 512, 100),
            Extent::new(3 * MIB - 1, 2),
        ];
        let chunks = covered_chunks(&extents, 4 * MIB).unwrap();
        assert_eq!(chunks, vec![0, 1, 2, 3]);
        let mut sorted = chunks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(chunks, sorted);
    }

    #[test]
    fn test_last_byte_of_disk() {
        let extents = vec![Extent::new(3 * MIB - 1, 1)];
        assert_eq!(covered_chunks(&extents, 3 * MIB).unwrap(), vec![2]);
    }

    #[test]
    fn test_malformed_extents_rejected() {
        let unsorted = vec![Extent::new(MIB, 10), Extent::new(0, 10)];
        assert!(covered_chunks(&unsorted, 2 * MIB).is_err());

        let overflowing = vec![Extent::new(u64::MAX, 1)];
        assert!(covered_chunks(&overflowing, u64::MAX).is_err());
    }
}
