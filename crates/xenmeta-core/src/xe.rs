//! Attribute resolution against the `xe` inventory command.
//!
//! Every lookup is one synchronous `xe` invocation in `--minimal` mode, which
//! prints a comma-separated value list on stdout. The [`CommandRunner`] trait
//! is the seam between the resolver and the external process, so tests can
//! substitute a scripted runner.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Runs one external inventory command and returns its stdout.
///
/// Implementations must treat every failure mode (launch error, non-zero
/// exit, unreadable output) as an error; the resolver never retries.
pub trait CommandRunner {
    fn run(&self, args: &[String]) -> Result<String>;
}

/// The production runner: invokes the `xe` binary.
#[derive(Debug, Clone)]
pub struct XeCli {
    binary: PathBuf,
}

impl XeCli {
    /// Default location of the `xe` binary on a XenServer host.
    pub const DEFAULT_BINARY: &'static str = "/usr/bin/xe";

    /// Create a runner for the given `xe` binary path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for XeCli {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BINARY)
    }
}

impl CommandRunner for XeCli {
    fn run(&self, args: &[String]) -> Result<String> {
        debug!(binary = %self.binary.display(), ?args, "running xe query");
        let output = Command::new(&self.binary).args(args).output().map_err(|e| {
            Error::query(format!("failed to run '{}': {e}", self.binary.display()))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::query(format!(
                "'{} {}' failed ({}): {}",
                self.binary.display(),
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| Error::query(format!("xe output is not valid UTF-8: {e}")))
    }
}

/// Which listing subcommand a query goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Vm,
    Snapshot,
    Vbd,
}

impl Listing {
    pub fn subcommand(self) -> &'static str {
        match self {
            Listing::Vm => "vm-list",
            Listing::Snapshot => "snapshot-list",
            Listing::Vbd => "vbd-list",
        }
    }
}

/// Discovery filter expressions accepted by [`Resolver::discover_vms`].
const FILTER_ALLOW_LIST: &[&str] = &[
    "power-state=running",
    "power-state=halted",
    "power-state=paused",
    "power-state=suspended",
];

/// Resolves entity attributes through repeated inventory queries.
///
/// Lookups are uncached: two attributes of the same entity are two separate
/// invocations, idempotent within a run.
pub struct Resolver<R> {
    runner: R,
}

impl<R: CommandRunner> Resolver<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run one listing query and split its `--minimal` output on commas.
    ///
    /// The returned sequence is never empty: an empty external result splits
    /// into a single empty string, which callers building child collections
    /// treat as "no children".
    pub fn resolve(
        &self,
        listing: Listing,
        filters: &[(&str, &str)],
        param: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut args = vec![listing.subcommand().to_string()];
        for (key, value) in filters {
            args.push(format!("{key}={value}"));
        }
        if let Some(param) = param {
            args.push(format!("params={param}"));
        }
        args.push("--minimal".to_string());

        let out = self.runner.run(&args)?;
        Ok(out.trim_end().split(',').map(str::to_string).collect())
    }

    /// Resolve a single named attribute of one entity.
    pub fn attribute(&self, listing: Listing, uuid: &str, param: &str) -> Result<String> {
        let values = self.resolve(listing, &[("uuid", uuid)], Some(param))?;
        Ok(values.into_iter().next().unwrap_or_default())
    }

    /// Resolve a collection-valued attribute into a list of child uuids.
    pub fn child_ids(&self, listing: Listing, uuid: &str, param: &str) -> Result<Vec<String>> {
        let values = self.resolve(listing, &[("uuid", uuid)], Some(param))?;
        Ok(non_empty(values))
    }

    /// List the uuids of the disk-type VBDs attached to a VM.
    ///
    /// Other attachment kinds (CD, floppy) are filtered out by the query
    /// itself, not by the caller.
    pub fn vm_vbds(&self, vm_uuid: &str) -> Result<Vec<String>> {
        let values = self.resolve(
            Listing::Vbd,
            &[("vm-uuid", vm_uuid), ("type", "Disk")],
            None,
        )?;
        Ok(non_empty(values))
    }

    /// Discovery query: list all VM uuids, optionally filtered.
    ///
    /// The filter expression is checked against a fixed allow-list; an
    /// unrecognized expression falls back to an unfiltered listing with a
    /// warning rather than failing the run.
    pub fn discover_vms(&self, filter: Option<&str>) -> Result<Vec<String>> {
        let mut filters: Vec<(&str, &str)> = Vec::new();
        if let Some(expr) = filter {
            match allowed_filter(expr) {
                Some(pair) => {
                    debug!(filter = expr, "using discovery filter");
                    filters.push(pair);
                }
                None => warn!(filter = expr, "unrecognized filter, listing all VMs"),
            }
        }
        let values = self.resolve(Listing::Vm, &filters, None)?;
        Ok(non_empty(values))
    }
}

/// Drop the empty-string elements an empty `--minimal` result splits into.
fn non_empty(values: Vec<String>) -> Vec<String> {
    values.into_iter().filter(|v| !v.is_empty()).collect()
}

fn allowed_filter(expr: &str) -> Option<(&str, &str)> {
    if FILTER_ALLOW_LIST.contains(&expr) {
        expr.split_once('=')
    } else {
        None
    }
}
