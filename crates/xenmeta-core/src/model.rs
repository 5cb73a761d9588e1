//! Typed records for the export document.
//!
//! Each entity the inventory exposes gets its own struct, assembled directly
//! from attribute queries. Identifiers are opaque uuid strings and stay
//! stable for the duration of a run.

/// The root container of an export: all VMs, in discovery order.
///
/// VM order mirrors the identifier list the tree was built from. It is never
/// re-sorted, and duplicate identifiers produce duplicate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub vms: Vec<VirtualMachine>,
}

impl Inventory {
    /// Number of snapshots across all VMs.
    pub fn snapshot_count(&self) -> usize {
        self.vms.iter().map(|vm| vm.snapshots.len()).sum()
    }

    /// Number of storage attachments across all VMs.
    pub fn vbd_count(&self) -> usize {
        self.vms.iter().map(|vm| vm.vbds.len()).sum()
    }

    /// Number of parent links across all VMs.
    pub fn parent_count(&self) -> usize {
        self.vms.iter().map(|vm| vm.parents.len()).sum()
    }
}

/// A virtual machine and its child collections.
///
/// A VM with no children in some category carries an empty vector, which
/// serializes as a present-but-empty container element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualMachine {
    pub uuid: String,
    pub name_label: String,
    pub parents: Vec<ParentLink>,
    pub vbds: Vec<Vbd>,
    pub snapshots: Vec<Snapshot>,
}

/// A lineage edge of a VM.
///
/// `selfparent` marks the degenerate self-referential lineage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub uuid: String,
    pub selfparent: bool,
}

/// A disk-type storage attachment (VBD) and the label of its backing volume.
///
/// Only the `Disk` kind is exported; the listing query filters out other
/// attachment kinds server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vbd {
    pub uuid: String,
    pub vbd_type: String,
    pub vdi_name_label: String,
}

/// A point-in-time snapshot of a VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub uuid: String,
    pub name_label: String,
    /// May be empty, never absent.
    pub name_description: String,
    /// Whether the snapshot was taken by a snapshot schedule.
    pub is_vmss_snapshot: bool,
}
