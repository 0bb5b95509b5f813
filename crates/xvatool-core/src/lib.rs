//! xvatool Core Library
//!
//! This crate provides the core functionality for exporting sparse
//! virtual-disk images into a single XVA-style appliance archive: a tar
//! container holding an `ova.xml` manifest describing the VM object
//! graph (VM, VBDs, VDIs, SR) plus the disk content split into 1 MiB
//! chunks, each chunk immediately followed by its SHA-1 checksum entry.
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`sparse`] - Sparse disk content abstraction and chunk reading
//! - [`chunker`] - Extent-to-chunk index mapping
//! - [`hash`] - Streaming digest computation and checksum entries
//! - [`ids`] - Sequential id and instance-identifier allocation
//! - [`manifest`] - `ova.xml` manifest generation from templates
//! - [`builder`] - Single-pass archive emission
//! - [`raw`] - Raw disk image input with zero-block detection
//! - [`export`] - Export orchestrator and image inspection
//!
//! # Quick Start
//!
//! ```
//! use xvatool_core::{MemoryDisk, XvaBuilder};
//!
//! let disk = MemoryDisk::dense(vec![0x42; 128 * 1024]);
//! let mut builder = XvaBuilder::new().with_vm_name("demo");
//! builder.add_disk("root", &disk).unwrap();
//!
//! let archive: Vec<u8> = builder.build(Vec::new()).unwrap();
//! assert!(!archive.is_empty());
//! ```

pub mod builder;
pub mod chunker;
pub mod error;
pub mod export;
pub mod hash;
pub mod ids;
pub mod manifest;
pub mod raw;
pub mod sparse;

pub use error::{Error, Result};

// Re-export the main surface for convenience
pub use builder::{XvaBuilder, MANIFEST_NAME};
pub use export::{
    export_images, get_image_info, ExportOptions, ExportSummary, ImageInfo, ProgressCallback,
};
pub use raw::RawDisk;
pub use sparse::{Extent, MemoryDisk, SparseContent, CHUNK_SIZE};
