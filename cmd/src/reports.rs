//! Collaborator seam for the `rep` command.
//!
//! Report rendering (DOT/Graphviz output) lives outside the core; the
//! pipeline only validates the flags and hands the request to whatever
//! implementation the host wires in.

use crate::CmdError;
use disk::{DiskManager, PartitionRef};
use std::path::Path;

/// Renders one report kind for a mounted partition into `out`.
pub trait Reports: Send + Sync {
    fn generate(
        &self,
        dm: &DiskManager,
        part: &PartitionRef,
        kind: &str,
        out: &Path,
        ruta: Option<&str>,
    ) -> Result<String, CmdError>;
}

/// Default wiring: no renderer installed.
pub struct NullReports;

impl Reports for NullReports {
    fn generate(
        &self,
        _dm: &DiskManager,
        _part: &PartitionRef,
        kind: &str,
        _out: &Path,
        _ruta: Option<&str>,
    ) -> Result<String, CmdError> {
        Err(CmdError::Unsupported(format!("rep {kind}")))
    }
}
