//! Export orchestration for disk images.
//!
//! Ties the pieces together for the common case: open raw images, build
//! the archive through [`XvaBuilder`], and stream it to a file, with
//! optional gzip compression of the whole container and a byte-count
//! progress callback for interactive frontends.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::builder::XvaBuilder;
use crate::chunker::covered_chunks;
use crate::error::{Error, Result};
use crate::raw::RawDisk;
use crate::sparse::SparseContent;

/// Options for the export process.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// VM name label rendered into the manifest.
    pub vm_name: String,
    /// Gzip the whole archive stream.
    pub compress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            vm_name: "VM".to_string(),
            compress: false,
        }
    }
}

impl ExportOptions {
    /// Create new export options with the given settings.
    pub fn new(vm_name: impl Into<String>, compress: bool) -> Self {
        Self {
            vm_name: vm_name.into(),
            compress,
        }
    }
}

/// Callback invoked with the total bytes written to the output so far.
pub type ProgressCallback = Box<dyn FnMut(u64)>;

/// Summary information about an input image.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Filename of the image.
    pub filename: String,
    /// Virtual size of the image in bytes.
    pub size_bytes: u64,
    /// Bytes inside occupied extents.
    pub occupied_bytes: u64,
    /// Number of chunks the export will emit for this image.
    pub covered_chunks: usize,
}

/// Result of a completed export.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Bytes written to the output file.
    pub bytes_written: u64,
    /// Number of disks exported.
    pub disks: usize,
}

/// Inspect an image without exporting it.
pub fn get_image_info(path: &Path) -> Result<ImageInfo> {
    let disk = RawDisk::open(path)?;
    let chunks = covered_chunks(disk.extents(), disk.len())?;

    Ok(ImageInfo {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        size_bytes: disk.len(),
        occupied_bytes: disk.occupied_bytes(),
        covered_chunks: chunks.len(),
    })
}

/// Export one or more raw disk images to an XVA archive at `output`.
///
/// Disk keys are derived from the image file stems; a second image with
/// the same stem gets a numeric suffix. The progress callback, if any,
/// is invoked with the running byte count written to the output file
/// (compressed bytes when `compress` is set).
pub fn export_images(
    images: &[PathBuf],
    output: &Path,
    options: &ExportOptions,
    progress: Option<ProgressCallback>,
) -> Result<ExportSummary> {
    if images.is_empty() {
        return Err(Error::export("no input images given"));
    }

    let mut disks = Vec::with_capacity(images.len());
    for path in images {
        disks.push(RawDisk::open(path)?);
    }

    let mut builder = XvaBuilder::new().with_vm_name(&options.vm_name);
    for (index, (path, disk)) in images.iter().zip(&disks).enumerate() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "disk".to_string());
        let key = if builder.contains_disk(&stem) {
            format!("{stem}_{index}")
        } else {
            stem
        };
        builder.add_disk(key, disk)?;
    }

    let file = File::create(output).map_err(|e| Error::io(e, output))?;
    let counting = CountingWriter::new(file, progress);

    let bytes_written = if options.compress {
        let encoder = GzEncoder::new(counting, Compression::default());
        let counting = builder
            .build(encoder)?
            .finish()
            .map_err(Error::io_simple)?;
        counting.bytes_written()
    } else {
        builder.build(counting)?.bytes_written()
    };

    Ok(ExportSummary {
        bytes_written,
        disks: disks.len(),
    })
}

/// Writer wrapper that counts bytes and reports them to a callback.
struct CountingWriter<W> {
    inner: W,
    written: u64,
    progress: Option<ProgressCallback>,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W, progress: Option<ProgressCallback>) -> Self {
        Self {
            inner,
            written: 0,
            progress,
        }
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(progress) = self.progress.as_mut() {
            progress(self.written);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
