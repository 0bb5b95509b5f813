//! xvatool CLI - Export raw disk images to XVA appliance archives.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use xvatool_core::{export_images, get_image_info, ExportOptions, ImageInfo, CHUNK_SIZE};

/// Export sparse disk images to XVA appliance archives.
#[derive(Parser)]
#[command(name = "xvatool")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export one or more raw disk images to an XVA archive.
    Export {
        /// Paths of the raw disk images, in VBD device order.
        images: Vec<PathBuf>,

        /// Output archive path. Defaults to the VM name with .xva extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// VM name label written into the manifest.
        #[arg(short, long, default_value = "VM")]
        name: String,

        /// Gzip the archive stream.
        #[arg(short, long)]
        compress: bool,

        /// Suppress progress output.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Display occupancy information about a raw disk image.
    Info {
        /// Path to the disk image.
        image: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            images,
            output,
            name,
            compress,
            quiet,
        } => {
            run_export(&images, output, &name, compress, quiet)?;
        }
        Commands::Info { image } => {
            show_info(&image)?;
        }
    }

    Ok(())
}

fn run_export(
    images: &[PathBuf],
    output: Option<PathBuf>,
    name: &str,
    compress: bool,
    quiet: bool,
) -> Result<()> {
    if images.is_empty() {
        bail!("no input images given");
    }

    let mut infos = Vec::with_capacity(images.len());
    for image in images {
        infos.push(get_image_info(image)?);
    }

    let output_path = output.unwrap_or_else(|| {
        let extension = if compress { "xva.gz" } else { "xva" };
        PathBuf::from(format!("{}.{extension}", sanitize_filename(name)))
    });

    if !quiet {
        println!("XVA Export");
        println!("----------");
        println!("Name:      {name}");
        println!("Disks:     {}", infos.len());
        for (i, info) in infos.iter().enumerate() {
            println!(
                "  {}. {} - {} virtual, {} occupied ({} chunks)",
                i + 1,
                info.filename,
                format_bytes(info.size_bytes),
                format_bytes(info.occupied_bytes),
                info.covered_chunks
            );
        }
        println!();
        println!("Output:    {}", output_path.display());
        println!("Compress:  {}", if compress { "gzip" } else { "none" });
        println!();
    }

    // Approximate output size: chunk payloads dominate; headers,
    // checksum entries and the manifest add a little per chunk.
    let estimated: u64 = infos
        .iter()
        .map(|i| i.covered_chunks as u64 * (CHUNK_SIZE + 2048))
        .sum::<u64>()
        + 8192;

    let progress_bar = if quiet {
        None
    } else {
        let pb = ProgressBar::new(estimated);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")?
            .progress_chars("#>-");
        pb.set_style(style);
        Some(pb)
    };

    let callback: Option<xvatool_core::ProgressCallback> = progress_bar.clone().map(|pb| {
        Box::new(move |written: u64| pb.set_position(written)) as xvatool_core::ProgressCallback
    });

    let options = ExportOptions::new(name, compress);
    let summary = export_images(images, &output_path, &options, callback)?;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    if !quiet {
        println!(
            "Export completed successfully: {} ({})",
            output_path.display(),
            format_bytes(summary.bytes_written)
        );
    }

    Ok(())
}

fn show_info(image: &std::path::Path) -> Result<()> {
    let info: ImageInfo = get_image_info(image)?;

    println!("Image Information");
    println!("=================");
    println!();
    println!("File:      {}", info.filename);
    println!("Size:      {}", format_bytes(info.size_bytes));
    println!("Occupied:  {}", format_bytes(info.occupied_bytes));
    println!("Chunks:    {}", info.covered_chunks);
    if info.size_bytes > 0 {
        println!(
            "Occupancy: {:.1}%",
            (info.occupied_bytes as f64 / info.size_bytes as f64) * 100.0
        );
    }

    Ok(())
}

/// Format bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Sanitize a filename by replacing characters unsafe in file paths.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
