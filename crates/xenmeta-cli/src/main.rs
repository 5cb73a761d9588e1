//! xenmeta CLI - Export XenServer VM metadata to XML.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use xenmeta_core::{
    export_metadata, ExportConfig, ExportPhase, ExportProgress, Listing, Resolver, XeCli,
};

/// Export the metadata of XenServer VMs to a portable XML document.
#[derive(Parser)]
#[command(name = "xenmeta")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export VM metadata to an XML document.
    Export {
        /// Output file path. Overwritten if it already exists.
        #[arg(short, long)]
        output: PathBuf,

        /// Absolute path to the xe binary.
        #[arg(long, default_value = XeCli::DEFAULT_BINARY)]
        xe_binary: PathBuf,

        /// Discovery filter, e.g. power-state=running.
        #[arg(short, long)]
        filter: Option<String>,

        /// Suppress progress output.
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the VMs visible to the inventory command.
    List {
        /// Absolute path to the xe binary.
        #[arg(long, default_value = XeCli::DEFAULT_BINARY)]
        xe_binary: PathBuf,

        /// Discovery filter, e.g. power-state=running.
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            output,
            xe_binary,
            filter,
            quiet,
        } => {
            run_export(output, xe_binary, filter, quiet)?;
        }
        Commands::List { xe_binary, filter } => {
            list_vms(xe_binary, filter)?;
        }
    }

    Ok(())
}

fn run_export(
    output: PathBuf,
    xe_binary: PathBuf,
    filter: Option<String>,
    quiet: bool,
) -> Result<()> {
    let mut config = ExportConfig::new(output).with_xe_binary(xe_binary);
    if let Some(filter) = filter {
        config = config.with_filter(filter);
    }

    // Set up progress tracking
    let progress_bar: Option<Arc<Mutex<ProgressBar>>> = if quiet {
        None
    } else {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} VMs {msg}")?
            .progress_chars("#>-");
        pb.set_style(style);
        Some(Arc::new(Mutex::new(pb)))
    };

    let callback: Option<xenmeta_core::ProgressCallback> =
        progress_bar.clone().map(|pb_arc| {
            Box::new(move |progress: ExportProgress| {
                let pb = pb_arc.lock().unwrap();
                pb.set_length(progress.total_vms as u64);
                pb.set_position(progress.current_vm as u64);

                let phase_msg = match progress.phase {
                    ExportPhase::Discovering => "discovering...",
                    ExportPhase::Assembling => "assembling",
                    ExportPhase::Serializing => "serializing...",
                    ExportPhase::Writing => "writing...",
                    ExportPhase::Complete => "complete",
                };
                pb.set_message(phase_msg);
            }) as xenmeta_core::ProgressCallback
        });

    // Run the export
    let summary = export_metadata(&config, callback)?;

    if let Some(pb_arc) = progress_bar {
        pb_arc.lock().unwrap().finish_with_message("complete");
    }

    if !quiet {
        println!();
        println!(
            "Export completed successfully: {}",
            summary.output.display()
        );
        println!("VMs:       {}", summary.vm_count);
        println!("Snapshots: {}", summary.snapshot_count);
        println!("VBDs:      {}", summary.vbd_count);
        println!("Parents:   {}", summary.parent_count);
        println!("Size:      {} bytes", summary.bytes_written);
    }

    Ok(())
}

fn list_vms(xe_binary: PathBuf, filter: Option<String>) -> Result<()> {
    let resolver = Resolver::new(XeCli::new(xe_binary));
    let uuids = resolver.discover_vms(filter.as_deref())?;

    if uuids.is_empty() {
        println!("No VMs found.");
        return Ok(());
    }

    for uuid in uuids {
        let name = resolver.attribute(Listing::Vm, &uuid, "name-label")?;
        println!("{uuid}  {name}");
    }

    Ok(())
}
