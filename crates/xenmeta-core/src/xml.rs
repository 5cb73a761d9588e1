//! XML rendering of the export document.
//!
//! The layout is fixed: a `vms` root wrapping one `vm` element per machine,
//! each with `parents`, `vbds` and `snapshots` container elements. Empty
//! collections render as present-but-empty containers, never omitted ones.
//! Indentation is four spaces per nesting level and stable across runs so
//! exports stay diffable.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::{Error, Result};
use crate::model::{Inventory, VirtualMachine};

const INDENT_CHAR: u8 = b' ';
const INDENT_SIZE: usize = 4;

/// Render the full inventory to its on-disk XML form.
pub fn render(inventory: &Inventory) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), INDENT_CHAR, INDENT_SIZE);

    emit(&mut writer, Event::Start(BytesStart::new("vms")))?;
    for vm in &inventory.vms {
        write_vm(&mut writer, vm)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("vms")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::serialize(e.to_string()))
}

fn write_vm<W: Write>(writer: &mut Writer<W>, vm: &VirtualMachine) -> Result<()> {
    let mut elem = BytesStart::new("vm");
    elem.push_attribute(("name", vm.name_label.as_str()));
    elem.push_attribute(("uuid", vm.uuid.as_str()));
    emit(writer, Event::Start(elem))?;

    emit(writer, Event::Start(BytesStart::new("parents")))?;
    for parent in &vm.parents {
        let mut elem = BytesStart::new("parent");
        elem.push_attribute(("uuid", parent.uuid.as_str()));
        elem.push_attribute(("selfparent", flag(parent.selfparent)));
        emit(writer, Event::Empty(elem))?;
    }
    emit(writer, Event::End(BytesEnd::new("parents")))?;

    emit(writer, Event::Start(BytesStart::new("vbds")))?;
    for vbd in &vm.vbds {
        let mut elem = BytesStart::new("vbd");
        elem.push_attribute(("uuid", vbd.uuid.as_str()));
        elem.push_attribute(("type", vbd.vbd_type.as_str()));
        elem.push_attribute(("vdi-name-label", vbd.vdi_name_label.as_str()));
        emit(writer, Event::Empty(elem))?;
    }
    emit(writer, Event::End(BytesEnd::new("vbds")))?;

    emit(writer, Event::Start(BytesStart::new("snapshots")))?;
    for snapshot in &vm.snapshots {
        let mut elem = BytesStart::new("snapshot");
        elem.push_attribute(("uuid", snapshot.uuid.as_str()));
        elem.push_attribute(("name-label", snapshot.name_label.as_str()));
        elem.push_attribute(("name-description", snapshot.name_description.as_str()));
        elem.push_attribute(("is-vmss-snapshot", flag(snapshot.is_vmss_snapshot)));
        emit(writer, Event::Empty(elem))?;
    }
    emit(writer, Event::End(BytesEnd::new("snapshots")))?;

    emit(writer, Event::End(BytesEnd::new("vm")))
}

/// Booleans serialize as lowercase text, never as numeric flags.
fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::serialize(e.to_string()))
}
