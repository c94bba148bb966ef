//! Script execution: one command per line.

use crate::adapter::Adapter;
use crate::types::{LineResult, ScriptOutcome};

/// Runs a whole script, skipping blank lines and `#` comments. A failing
/// line is recorded and execution continues.
pub fn run_script(adapter: &Adapter, script: &str) -> ScriptOutcome {
    let mut results = Vec::new();
    let mut succeeded = 0;
    let mut failed = 0;

    for (i, raw) in script.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let outcome = adapter.run_outcome(line);
        if outcome.ok {
            succeeded += 1;
        } else {
            failed += 1;
        }
        results.push(LineResult {
            line: i + 1,
            input: line.to_owned(),
            output: outcome.output,
            success: outcome.ok,
            error: outcome.error,
        });
    }

    ScriptOutcome {
        ok: failed == 0,
        total: results.len(),
        succeeded,
        failed,
        results,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn comments_and_blanks_skipped_failures_continue() {
        let adapter = Adapter::new();
        let script = "# un comentario\n\nmounted\nnoexiste -x 1\nmounted\n";
        let outcome = run_script(&adapter, script);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.ok);
        // Line numbers refer to the script, not to the executed subset.
        assert_eq!(outcome.results[0].line, 3);
        assert_eq!(outcome.results[1].line, 4);
        assert!(outcome.results[1].error.is_some());
        assert_eq!(outcome.results[2].line, 5);
    }
}
