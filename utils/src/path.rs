//! UNIX-style path normalisation for paths inside a mounted partition.

/// Canonicalises an absolute path, collapsing `.` and `..` components.
///
/// Returns `None` when the path is empty or does not start with `/`. The
/// result is either `/` or `/a/b/c` with no trailing slash.
pub fn clean(path: &str) -> Option<String> {
    if !path.starts_with('/') {
        return None;
    }
    let mut parts: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            comp => parts.push(comp),
        }
    }
    if parts.is_empty() {
        Some("/".to_owned())
    } else {
        Some(format!("/{}", parts.join("/")))
    }
}

/// Splits a path into its components: `[]` for `/`, `["a", "b", "c"]` for
/// `/a/b/c`. Returns `None` on an invalid path.
pub fn split(path: &str) -> Option<Vec<String>> {
    let cleaned = clean(path)?;
    if cleaned == "/" {
        return Some(Vec::new());
    }
    Some(
        cleaned
            .trim_start_matches('/')
            .split('/')
            .map(str::to_owned)
            .collect(),
    )
}

/// Splits a path into its parent components and the final name.
///
/// Returns `None` for `/` (which has no parent) and for invalid paths.
pub fn split_parent(path: &str) -> Option<(Vec<String>, String)> {
    let mut parts = split(path)?;
    let name = parts.pop()?;
    Some((parts, name))
}
