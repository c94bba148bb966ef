//! This crate implements features common to the other crates of the
//! workspace: binary record I/O on disk image files, path and permission
//! handling, and terminal prompting.

pub mod io;
pub mod path;
pub mod perm;
pub mod prompt;
pub mod util;
