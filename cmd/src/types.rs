//! Result shapes of the pipeline, serialised at the collaborator
//! boundary (the HTTP façade consumes these as JSON).

use serde::Serialize;

/// Outcome of one command line.
#[derive(Clone, Debug, Serialize)]
pub struct RunOutcome {
    pub ok: bool,
    pub input: String,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Outcome of one script line.
#[derive(Clone, Debug, Serialize)]
pub struct LineResult {
    pub line: usize,
    pub input: String,
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a whole script run.
#[derive(Clone, Debug, Serialize)]
pub struct ScriptOutcome {
    pub ok: bool,
    pub results: Vec<LineResult>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
