//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that keep herald's production code
//! honest:
//! - No sleeping; wait on I/O or a deadline instead
//! - No panicking shortcuts (`unwrap`/`expect`) outside test code
//!
//! The helpers below are shared by the tests in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories checked by the tests
pub const PRODUCTION_DIRS: &[&str] = &["herald/core/src", "herald/listen/src"];

/// One offending line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the line is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Workspace root, resolved from this crate's manifest
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every `.rs` file under the production directories
#[must_use]
pub fn production_files() -> Vec<PathBuf> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .map(|dir| root.join(dir))
        .filter(|dir| dir.exists())
        .flat_map(|dir| {
            walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
                .map(walkdir::DirEntry::into_path)
        })
        .collect()
}

/// Lines of `content` before its `#[cfg(test)]` module, comments stripped
///
/// Test modules sit at the bottom of each file, so everything after the
/// first `#[cfg(test)]` is test code.
#[must_use]
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(idx, line)| (idx + 1, strip_comment(line)))
        .collect()
}

/// `line` up to its first `//` outside a string or char literal
///
/// Strings are tracked per line only; raw strings and literals spanning
/// lines are not understood.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            // '"' and '\"'
            b'\'' if !in_string && bytes.get(i + 2) == Some(&b'\'') => i += 2,
            b'\''
                if !in_string
                    && bytes.get(i + 1) == Some(&b'\\')
                    && bytes.get(i + 3) == Some(&b'\'') =>
            {
                i += 3;
            }
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
        i += 1;
    }

    line
}

/// Scan every production file for lines matching `is_violation`
#[must_use]
pub fn find_violations(is_violation: impl Fn(&str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();

    for path in production_files() {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (line, code) in production_lines(&content) {
            if is_violation(code) {
                violations.push(Violation {
                    path: path.clone(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }

    violations
}

/// Panic with a readable report if there are violations
pub fn report(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {rule}.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let code = "fn real() {}\n// a comment\nlet x = y; // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(code);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (1, "fn real() {}"));
        assert_eq!(lines[1], (3, "let x = y; "));
    }

    #[test]
    fn test_comment_markers_inside_literals_kept() {
        let line = r#"let url = "ws://host"; x.unwrap() // trailing"#;
        assert_eq!(strip_comment(line), r#"let url = "ws://host"; x.unwrap() "#);

        let escaped = r#"let s = "a \"//\" b"; s.len()"#;
        assert_eq!(strip_comment(escaped), escaped);

        let quote = r#"if c == '"' { y.expect("x") } // done"#;
        assert_eq!(strip_comment(quote), r#"if c == '"' { y.expect("x") } "#);

        let escaped_quote = r#"let q = '\"'; z.unwrap() // done"#;
        assert_eq!(strip_comment(escaped_quote), r#"let q = '\"'; z.unwrap() "#);
    }

    #[test]
    fn test_workspace_root_contains_core() {
        assert!(workspace_root().join("herald/core/Cargo.toml").exists());
        assert!(!production_files().is_empty());
    }
}
