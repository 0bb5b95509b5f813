//! XVA builder: disk registration and single-pass archive emission.
//!
//! [`XvaBuilder`] collects sparse disks, then serializes one XVA archive
//! in a single pass: the `ova.xml` manifest entry first, followed per
//! disk by a content entry and a checksum entry for every covered 1 MiB
//! chunk. Entry names and manifest cross-references share one id
//! assignment, produced fresh for each build.
//!
//! The serializer is `tar::Builder`, which reads each appended source to
//! exhaustion before the next append runs. That sequencing is load
//! bearing: a checksum entry's bytes only exist once its content entry
//! has been fully consumed (see [`crate::hash`]).

use std::io::{Read, Write};

use tar::{Builder as TarBuilder, Header};

use crate::chunker::covered_chunks;
use crate::error::{Error, Result};
use crate::hash::{ChecksumEntry, HashingReader, SharedDigest, DIGEST_HEX_LEN};
use crate::ids::{reference, IdAllocation};
use crate::manifest::{generate_manifest, DiskMeta, Manifest, ManifestTemplates};
use crate::sparse::{validate_extents, ChunkReader, SparseContent, CHUNK_SIZE};

/// Archive entry name of the manifest.
pub const MANIFEST_NAME: &str = "ova.xml";

/// Builds an XVA appliance archive from sparse disks.
///
/// Disks are kept in an explicit insertion-ordered list; that order
/// decides id assignment, manifest layout, and chunk emission alike.
/// The builder borrows disk content and can be reused: adding more disks
/// and building again produces a fresh archive with new instance
/// identifiers. Concurrent builds on one builder are not supported;
/// callers serialize them.
///
/// # Example
///
/// ```
/// use xvatool_core::{MemoryDisk, XvaBuilder};
///
/// let disk = MemoryDisk::dense(vec![0xAB; 4096]);
/// let mut builder = XvaBuilder::new();
/// builder.add_disk("root", &disk).unwrap();
/// let archive: Vec<u8> = builder.build(Vec::new()).unwrap();
/// assert!(!archive.is_empty());
/// ```
pub struct XvaBuilder<'a> {
    vm_name: String,
    templates: ManifestTemplates,
    disks: Vec<(String, &'a dyn SparseContent)>,
}

impl<'a> XvaBuilder<'a> {
    /// Creates an empty builder with default templates and VM name.
    pub fn new() -> Self {
        Self {
            vm_name: "VM".to_string(),
            templates: ManifestTemplates::default(),
            disks: Vec::new(),
        }
    }

    /// Sets the VM name label rendered into the manifest.
    pub fn with_vm_name(mut self, name: impl Into<String>) -> Self {
        self.vm_name = name.into();
        self
    }

    /// Replaces the manifest templates.
    pub fn with_templates(mut self, templates: ManifestTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Registers a disk under `key`.
    ///
    /// Fails with [`Error::DuplicateDisk`] if the key is already
    /// registered, and with [`Error::InvalidExtent`] if the disk reports
    /// a malformed extent list; in both cases the builder is unchanged.
    pub fn add_disk(&mut self, key: impl Into<String>, content: &'a dyn SparseContent) -> Result<()> {
        let key = key.into();
        if self.disks.iter().any(|(k, _)| *k == key) {
            return Err(Error::duplicate_disk(key));
        }
        validate_extents(content.extents(), content.len())?;
        self.disks.push((key, content));
        Ok(())
    }

    /// Number of registered disks.
    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    /// Whether a disk is already registered under `key`.
    pub fn contains_disk(&self, key: &str) -> bool {
        self.disks.iter().any(|(k, _)| k == key)
    }

    /// Serializes the archive into `writer` and returns it.
    ///
    /// Emits exactly one manifest entry plus, per disk in insertion
    /// order, one content/checksum entry pair per covered chunk. Errors
    /// from disk reads or the output writer propagate unchanged; there
    /// is no partial-success mode.
    pub fn build<W: Write>(&self, writer: W) -> Result<W> {
        let ids = IdAllocation::allocate(self.disks.len());
        let metas: Vec<DiskMeta> = self
            .disks
            .iter()
            .map(|(key, content)| DiskMeta {
                name: key.clone(),
                virtual_size: content.len(),
            })
            .collect();
        let manifest: Manifest = generate_manifest(&self.templates, &ids, &self.vm_name, &metas);

        let mut tar = TarBuilder::new(writer);
        append_entry(
            &mut tar,
            MANIFEST_NAME,
            manifest.text.len() as u64,
            manifest.text.as_bytes(),
        )?;

        for (disk_index, (_, content)) in self.disks.iter().enumerate() {
            append_disk_chunks(&mut tar, *content, manifest.vdi_ids[disk_index])?;
        }

        tar.into_inner().map_err(Error::io_simple)
    }
}

impl Default for XvaBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits the content and checksum entry pair for every covered chunk of
/// one disk, in ascending chunk order.
///
/// The content entry `Ref:<vdi>/<index as %08X>` carries
/// `min(CHUNK_SIZE, len - index * CHUNK_SIZE)` bytes read through a
/// [`HashingReader`]; the checksum entry carries the hex digest and must
/// only be read after the content entry has been exhausted. Composing
/// these with anything other than a strictly sequential, read-to-end
/// serializer produces a hard read error from the checksum entry.
fn append_disk_chunks<W: Write>(
    tar: &mut TarBuilder<W>,
    content: &dyn SparseContent,
    vdi_id: u32,
) -> Result<()> {
    let indices = covered_chunks(content.extents(), content.len())?;

    for index in indices {
        let offset = index * CHUNK_SIZE;
        let length = CHUNK_SIZE.min(content.len() - offset);
        let name = format!("{}/{:08X}", reference(vdi_id), index);

        let digest = SharedDigest::new();
        let chunk = HashingReader::new(ChunkReader::new(content, offset, length), digest.clone());
        append_entry(tar, &name, length, chunk)?;

        let checksum_name = format!("{name}.checksum");
        append_entry(tar, &checksum_name, DIGEST_HEX_LEN, ChecksumEntry::new(digest))?;
    }

    Ok(())
}

fn append_entry<W: Write, R: Read>(
    tar: &mut TarBuilder<W>,
    name: &str,
    size: u64,
    data: R,
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(size);
    header.set_mode(0o644);
    tar.append_data(&mut header, name, data)
        .map_err(Error::io_simple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::MemoryDisk;

    #[test]
    fn test_duplicate_key_rejected_without_mutation() {
        let a = MemoryDisk::dense(vec![1u8; 16]);
        let b = MemoryDisk::dense(vec![2u8; 16]);

        let mut builder = XvaBuilder::new();
        builder.add_disk("d1", &a).unwrap();
        let err = builder.add_disk("d1", &b).unwrap_err();

        assert!(matches!(err, Error::DuplicateDisk { .. }));
        assert_eq!(builder.disk_count(), 1);
    }

    #[test]
    fn test_malformed_extents_rejected_at_add_disk() {
        use crate::sparse::Extent;
        let disk = MemoryDisk::new(vec![0u8; 64], vec![Extent::new(32, 64)]);

        let mut builder = XvaBuilder::new();
        let err = builder.add_disk("d1", &disk).unwrap_err();

        assert!(matches!(err, Error::InvalidExtent { .. }));
        assert_eq!(builder.disk_count(), 0);
    }

    #[test]
    fn test_empty_disk_produces_manifest_only() {
        let disk = MemoryDisk::new(vec![0u8; 4096], Vec::new());

        let mut builder = XvaBuilder::new();
        builder.add_disk("d1", &disk).unwrap();
        let archive = builder.build(Vec::new()).unwrap();

        let mut tar = tar::Archive::new(std::io::Cursor::new(archive));
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![MANIFEST_NAME.to_string()]);
    }

    #[test]
    fn test_contains_disk() {
        let a = MemoryDisk::dense(vec![1u8; 16]);
        let mut builder = XvaBuilder::new();
        assert!(!builder.contains_disk("d1"));
        builder.add_disk("d1", &a).unwrap();
        assert!(builder.contains_disk("d1"));
    }
}
