//! Line tokeniser and flag parser.
//!
//! A command line is `name -flag value -flag value …`. Double quotes group
//! one token including its spaces. A flag followed by another flag (or by
//! the end of the line) is boolean `true`.

use crate::CmdError;
use std::collections::HashMap;

/// Splits a line into tokens, honouring double quotes.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// The parsed flag set of one command line.
#[derive(Clone, Debug, Default)]
pub struct Args {
    map: HashMap<String, String>,
}

impl Args {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// A required string flag; missing or empty means bad parameters.
    pub fn req(&self, key: &str) -> Result<&str, CmdError> {
        match self.get(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CmdError::Params),
        }
    }

    /// A boolean flag (`-p`, `-append`): present without value.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("true"))
    }

    /// An optional integer flag.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, CmdError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| CmdError::Params),
        }
    }

    /// Injects a flag value when it is absent (session mount id).
    pub fn inject(&mut self, key: &str, value: &str) {
        self.map
            .entry(key.to_owned())
            .or_insert_with(|| value.to_owned());
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }
}

/// One parsed command line: the lowercased command name and its flags.
#[derive(Clone, Debug)]
pub struct ParsedLine {
    pub name: String,
    pub args: Args,
}

/// Parses a line into name and flags. Flag names are lowercased; values
/// keep their case.
pub fn parse_line(line: &str) -> Result<ParsedLine, CmdError> {
    let tokens = tokenize(line);
    let (name, rest) = tokens.split_first().ok_or(CmdError::Params)?;

    let mut args = Args::default();
    let mut i = 0;
    while i < rest.len() {
        let token = &rest[i];
        if let Some(key) = token.strip_prefix('-') {
            let key = key.to_lowercase();
            match rest.get(i + 1) {
                Some(value) if !value.starts_with('-') => {
                    args.map.insert(key, value.clone());
                    i += 2;
                }
                _ => {
                    args.map.insert(key, "true".to_owned());
                    i += 1;
                }
            }
        } else {
            // Stray token outside a flag pair: ignored, as in the original
            // line format.
            i += 1;
        }
    }
    Ok(ParsedLine {
        name: name.to_lowercase(),
        args,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokenize_quotes() {
        assert_eq!(tokenize(r#"-a "b c" -d"#), vec!["-a", "b c", "-d"]);
        assert_eq!(tokenize("mkdisk -size 5"), vec!["mkdisk", "-size", "5"]);
        assert_eq!(tokenize("   "), Vec::<String>::new());
    }

    #[test]
    fn flags_and_booleans() {
        let parsed = parse_line(r#"mkdir -id 841A -path "/a b/c" -p"#).unwrap();
        assert_eq!(parsed.name, "mkdir");
        assert_eq!(parsed.args.get("id"), Some("841A"));
        assert_eq!(parsed.args.get("path"), Some("/a b/c"));
        assert!(parsed.args.flag("p"));
        assert!(!parsed.args.flag("append"));
    }

    #[test]
    fn flag_names_lowercased() {
        let parsed = parse_line("MKDISK -Size 10 -PATH /tmp/a.dsk").unwrap();
        assert_eq!(parsed.name, "mkdisk");
        assert_eq!(parsed.args.get_i64("size").unwrap(), Some(10));
        assert_eq!(parsed.args.get("path"), Some("/tmp/a.dsk"));
    }

    #[test]
    fn empty_line_is_params_error() {
        assert!(matches!(parse_line(""), Err(CmdError::Params)));
    }

    #[test]
    fn negative_value_reads_as_boolean_flag() {
        // "-size -5" parses as two flags; the numeric check happens in
        // validation.
        let parsed = parse_line("mkdisk -size -5").unwrap();
        assert!(parsed.args.flag("size"));
    }
}
