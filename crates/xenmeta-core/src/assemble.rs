//! Entity assembly: one identifier in, one populated record out.
//!
//! Each assembler issues a fixed sequence of attribute queries and trusts
//! resolution success as the only correctness signal; there is no
//! cross-entity validation. A failed query aborts the whole build so the
//! export never silently drops an entity.

use crate::error::Result;
use crate::model::{Inventory, ParentLink, Snapshot, Vbd, VirtualMachine};
use crate::xe::{CommandRunner, Listing, Resolver};

/// Storage attachment kind covered by the export.
const DISK_KIND: &str = "Disk";

/// Assembles the export tree from an ordered list of VM uuids.
pub struct TreeBuilder<'a, R> {
    xe: &'a Resolver<R>,
}

impl<'a, R: CommandRunner> TreeBuilder<'a, R> {
    pub fn new(xe: &'a Resolver<R>) -> Self {
        Self { xe }
    }

    /// Build the full inventory for the given uuids, preserving input order.
    ///
    /// Repeated uuids are re-resolved independently and appear repeatedly in
    /// the output; nothing is deduplicated.
    pub fn build(&self, uuids: &[String]) -> Result<Inventory> {
        let mut vms = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            vms.push(self.assemble_vm(uuid)?);
        }
        Ok(Inventory { vms })
    }

    /// Resolve one VM: display name first, then the snapshot, storage and
    /// parent collections, each child in discovery order.
    pub fn assemble_vm(&self, uuid: &str) -> Result<VirtualMachine> {
        let name_label = self.xe.attribute(Listing::Vm, uuid, "name-label")?;

        let mut snapshots = Vec::new();
        for snap_uuid in self.xe.child_ids(Listing::Vm, uuid, "snapshots")? {
            snapshots.push(self.assemble_snapshot(&snap_uuid)?);
        }

        let mut vbds = Vec::new();
        for vbd_uuid in self.xe.vm_vbds(uuid)? {
            vbds.push(self.assemble_vbd(&vbd_uuid)?);
        }

        let mut parents = Vec::new();
        for parent_uuid in self.xe.child_ids(Listing::Vm, uuid, "parent")? {
            parents.push(self.assemble_parent(&parent_uuid)?);
        }

        Ok(VirtualMachine {
            uuid: uuid.to_string(),
            name_label,
            parents,
            vbds,
            snapshots,
        })
    }

    /// Resolve one snapshot: label, description and schedule flag are three
    /// separate attribute queries on the snapshot listing.
    pub fn assemble_snapshot(&self, uuid: &str) -> Result<Snapshot> {
        let name_label = self.xe.attribute(Listing::Snapshot, uuid, "name-label")?;
        let name_description = self
            .xe
            .attribute(Listing::Snapshot, uuid, "name-description")?;
        let is_vmss = self
            .xe
            .attribute(Listing::Snapshot, uuid, "is-vmss-snapshot")?;

        Ok(Snapshot {
            uuid: uuid.to_string(),
            name_label,
            name_description,
            is_vmss_snapshot: parse_flag(&is_vmss),
        })
    }

    /// Resolve one storage attachment: only the backing-volume label needs a
    /// query; the kind is `Disk` by construction of the listing filter.
    pub fn assemble_vbd(&self, uuid: &str) -> Result<Vbd> {
        let vdi_name_label = self.xe.attribute(Listing::Vbd, uuid, "vdi-name-label")?;

        Ok(Vbd {
            uuid: uuid.to_string(),
            vbd_type: DISK_KIND.to_string(),
            vdi_name_label,
        })
    }

    /// Resolve one parent link.
    pub fn assemble_parent(&self, uuid: &str) -> Result<ParentLink> {
        let selfparent = self.xe.attribute(Listing::Vm, uuid, "selfparent")?;

        Ok(ParentLink {
            uuid: uuid.to_string(),
            selfparent: parse_flag(&selfparent),
        })
    }
}

/// Parse the textual boolean representation used by the inventory command.
///
/// Anything other than case-insensitive `true` is `false`; an unparsable
/// value is not an error.
fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
