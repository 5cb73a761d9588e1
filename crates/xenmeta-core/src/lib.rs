//! xenmeta Core Library
//!
//! This crate exports metadata about the virtual machines managed by a
//! XenServer/Citrix Hypervisor pool into a structured XML document: VM
//! identity, storage attachments, snapshot lineage and parent relationships,
//! as a point-in-time inventory for backup cataloguing, migration planning
//! or audit.
//!
//! All data comes from the `xe` command line: every attribute lookup is one
//! synchronous `xe … --minimal` invocation. The crate never mutates the
//! virtualization environment.
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`model`] - Typed export records (VMs, snapshots, VBDs, parent links)
//! - [`xe`] - Attribute resolution through the external inventory command
//! - [`assemble`] - Entity assemblers and export tree building
//! - [`xml`] - Document serialization
//! - [`export`] - Export orchestrator coordinating the full run
//!
//! # Quick Start
//!
//! ```no_run
//! use xenmeta_core::{export_metadata, ExportConfig};
//!
//! let config = ExportConfig::new("/tmp/vms.export.xml")
//!     .with_filter("power-state=running");
//! let summary = export_metadata(&config, None).unwrap();
//! println!("exported {} VMs", summary.vm_count);
//! ```

pub mod assemble;
pub mod error;
pub mod export;
pub mod model;
pub mod xe;
pub mod xml;

pub use error::{Error, Result};

// Re-export the main export functionality for convenience
pub use export::{
    export_metadata, export_with_resolver, ExportConfig, ExportPhase, ExportProgress,
    ExportSummary, ProgressCallback,
};
pub use model::{Inventory, ParentLink, Snapshot, Vbd, VirtualMachine};
pub use xe::{CommandRunner, Listing, Resolver, XeCli};
