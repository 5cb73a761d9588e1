//! Export orchestrator.
//!
//! Coordinates a full metadata export:
//! 1. Discover the VM uuids to export (optionally filtered)
//! 2. Assemble every VM into the in-memory inventory tree
//! 3. Render the tree to XML
//! 4. Write the document to the output file
//!
//! Rendering only starts once the whole tree is assembled, so a failed
//! attribute query never leaves a partial document behind.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::assemble::TreeBuilder;
use crate::error::{Error, Result};
use crate::model::Inventory;
use crate::xe::{CommandRunner, Resolver, XeCli};

/// Run configuration, constructed once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Path of the export document. Created, or overwritten if present.
    pub output: PathBuf,
    /// Path of the `xe` binary.
    pub xe_binary: PathBuf,
    /// Optional discovery filter expression, e.g. `power-state=running`.
    pub filter: Option<String>,
}

impl ExportConfig {
    /// Create a configuration with the default `xe` binary and no filter.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            xe_binary: PathBuf::from(XeCli::DEFAULT_BINARY),
            filter: None,
        }
    }

    /// Use a different `xe` binary.
    pub fn with_xe_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.xe_binary = binary.into();
        self
    }

    /// Restrict discovery with a filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Phase of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    /// Listing the VM uuids to export.
    Discovering,
    /// Resolving VM attributes and child entities.
    Assembling,
    /// Rendering the assembled tree to XML.
    Serializing,
    /// Writing the document to disk.
    Writing,
    /// Export complete.
    Complete,
}

impl std::fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportPhase::Discovering => write!(f, "Discovering"),
            ExportPhase::Assembling => write!(f, "Assembling"),
            ExportPhase::Serializing => write!(f, "Serializing"),
            ExportPhase::Writing => write!(f, "Writing"),
            ExportPhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Progress information for the export process.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current phase of the export.
    pub phase: ExportPhase,
    /// VM currently being assembled (1-indexed, 0 before assembly starts).
    pub current_vm: usize,
    /// Total number of VMs to export.
    pub total_vms: usize,
}

/// Type alias for the progress callback function.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// What an export run produced.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Path the document was written to.
    pub output: PathBuf,
    /// Number of exported VMs.
    pub vm_count: usize,
    /// Number of exported snapshots across all VMs.
    pub snapshot_count: usize,
    /// Number of exported storage attachments across all VMs.
    pub vbd_count: usize,
    /// Number of exported parent links across all VMs.
    pub parent_count: usize,
    /// Size of the written document in bytes.
    pub bytes_written: u64,
}

/// Export VM metadata using the `xe` binary named in the configuration.
///
/// This is the production entry point; tests use [`export_with_resolver`]
/// with a scripted runner instead.
pub fn export_metadata(
    config: &ExportConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<ExportSummary> {
    let resolver = Resolver::new(XeCli::new(&config.xe_binary));
    export_with_resolver(&resolver, config, progress_callback)
}

/// Export VM metadata through an already-constructed resolver.
pub fn export_with_resolver<R: CommandRunner>(
    resolver: &Resolver<R>,
    config: &ExportConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<ExportSummary> {
    let report_progress = |progress: ExportProgress| {
        if let Some(ref callback) = progress_callback {
            callback(progress);
        }
    };

    report_progress(ExportProgress {
        phase: ExportPhase::Discovering,
        current_vm: 0,
        total_vms: 0,
    });
    let uuids = resolver.discover_vms(config.filter.as_deref())?;
    let total_vms = uuids.len();

    let builder = TreeBuilder::new(resolver);
    let mut vms = Vec::with_capacity(total_vms);
    for (index, uuid) in uuids.iter().enumerate() {
        report_progress(ExportProgress {
            phase: ExportPhase::Assembling,
            current_vm: index + 1,
            total_vms,
        });
        vms.push(builder.assemble_vm(uuid)?);
    }
    let inventory = Inventory { vms };

    report_progress(ExportProgress {
        phase: ExportPhase::Serializing,
        current_vm: total_vms,
        total_vms,
    });
    let document = crate::xml::render(&inventory)?;

    report_progress(ExportProgress {
        phase: ExportPhase::Writing,
        current_vm: total_vms,
        total_vms,
    });
    fs::write(&config.output, &document).map_err(|e| Error::io(e, &config.output))?;

    let summary = ExportSummary {
        output: config.output.clone(),
        vm_count: inventory.vms.len(),
        snapshot_count: inventory.snapshot_count(),
        vbd_count: inventory.vbd_count(),
        parent_count: inventory.parent_count(),
        bytes_written: document.len() as u64,
    };
    info!(
        vms = summary.vm_count,
        snapshots = summary.snapshot_count,
        vbds = summary.vbd_count,
        parents = summary.parent_count,
        output = %summary.output.display(),
        "export complete"
    );

    report_progress(ExportProgress {
        phase: ExportPhase::Complete,
        current_vm: total_vms,
        total_vms,
    });

    Ok(summary)
}
