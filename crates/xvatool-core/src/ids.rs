//! Sequential id and instance-identifier allocation for the manifest
//! object graph.
//!
//! One export assigns integer ids in a fixed order: the VM first, then
//! one VBD and one VDI per disk in insertion order, and the storage
//! repository last. Both the manifest and the chunk entry names derive
//! their `Ref:` tokens from this single assignment, so the order must
//! never depend on container iteration quirks.

use uuid::Uuid;

/// Render the `Ref:<id>` token shared by archive entry names and
/// manifest cross-references.
pub fn reference(id: u32) -> String {
    format!("Ref:{id}")
}

/// Integer id and fresh instance identifier for one object-graph entity.
#[derive(Debug, Clone)]
pub struct EntityIds {
    /// Sequential id, scoped to one export.
    pub id: u32,
    /// Globally unique instance identifier, fresh per allocation.
    pub uuid: Uuid,
}

impl EntityIds {
    /// The entity's `Ref:<id>` token.
    pub fn reference(&self) -> String {
        reference(self.id)
    }
}

/// Deterministic id assignment for one export.
///
/// The id *sequence* is reproducible: allocating twice for the same disk
/// count yields identical ids. The uuids are not; they are regenerated
/// on every allocation and must never be compared across exports.
#[derive(Debug, Clone)]
pub struct IdAllocation {
    pub vm: EntityIds,
    pub vbds: Vec<EntityIds>,
    pub vdis: Vec<EntityIds>,
    pub sr: EntityIds,
}

impl IdAllocation {
    /// Allocate ids for `disk_count` disks: VM is 0, each disk takes a
    /// VBD id then a VDI id, and the SR id is `2 * disk_count + 1`.
    pub fn allocate(disk_count: usize) -> Self {
        let mut next = 0u32;
        let mut fresh = || {
            let id = next;
            next += 1;
            EntityIds {
                id,
                uuid: Uuid::new_v4(),
            }
        };

        let vm = fresh();
        let mut vbds = Vec::with_capacity(disk_count);
        let mut vdis = Vec::with_capacity(disk_count);
        for _ in 0..disk_count {
            vbds.push(fresh());
            vdis.push(fresh());
        }
        let sr = fresh();

        Self { vm, vbds, vdis, sr }
    }

    /// VDI ids in disk insertion order, as consumed by chunk emission.
    pub fn vdi_ids(&self) -> Vec<u32> {
        self.vdis.iter().map(|e| e.id).collect()
    }
}
