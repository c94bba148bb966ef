//! The command pipeline: tokeniser, typed command table, dispatcher,
//! mount index, session and script runner.

pub mod adapter;
mod error;
pub mod handlers;
pub mod locks;
pub mod mount_index;
pub mod parser;
pub mod reports;
pub mod script;
pub mod session;
pub mod types;

pub use adapter::Adapter;
pub use error::CmdError;
pub use handlers::Command;
pub use mount_index::MountIndex;
pub use reports::{NullReports, Reports};
pub use script::run_script;
pub use session::SessionManager;
pub use types::{LineResult, RunOutcome, ScriptOutcome};
