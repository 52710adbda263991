//! Expansion of file patterns into concrete log files.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use jwalk::WalkDir;

use loglens_core::AnalyzeError;

/// Expand `patterns` into a sorted, deduplicated list of canonical file paths.
///
/// A pattern without glob metacharacters names a file directly and is kept
/// if it exists. Glob patterns are matched component-wise (`*` never crosses
/// a `/`, `**` does) against files under the pattern's literal prefix.
/// Directories are never returned. Relative patterns resolve against the
/// current directory.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, AnalyzeError> {
    let cwd = std::env::current_dir().map_err(|e| AnalyzeError::io(".", e))?;
    let mut found = BTreeSet::new();

    for pattern in patterns {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() {
            continue;
        }

        let absolute = normalize(&cwd.join(pattern));

        if !is_glob(pattern) {
            if absolute.is_file() {
                insert_canonical(&mut found, &absolute);
            } else {
                tracing::debug!(pattern, "skipping non-file path");
            }
            continue;
        }

        let matcher = GlobBuilder::new(&absolute.to_string_lossy())
            .literal_separator(true)
            .build()
            .map_err(|e| AnalyzeError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.kind().to_string(),
            })?
            .compile_matcher();

        let (base, depth) = walk_root(&absolute);
        if !base.is_dir() {
            tracing::debug!(pattern, base = %base.display(), "glob base is not a directory");
            continue;
        }

        let before = found.len();
        for entry in WalkDir::new(&base).skip_hidden(false).max_depth(depth) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if matcher.is_match(&path) {
                insert_canonical(&mut found, &path);
            }
        }
        tracing::debug!(pattern, matched = found.len() - before, "pattern expanded");
    }

    Ok(found.into_iter().collect())
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Drop `.` components so walked paths and the pattern agree textually.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Literal directory prefix of a glob and how deep below it matches can lie.
fn walk_root(pattern: &Path) -> (PathBuf, usize) {
    let mut base = PathBuf::new();
    let mut rest = Vec::new();

    for component in pattern.components() {
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !is_glob(&text) {
            base.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }

    let depth = if rest.iter().any(|c| c.contains("**")) {
        usize::MAX
    } else {
        rest.len()
    };
    (base, depth)
}

fn insert_canonical(found: &mut BTreeSet<PathBuf>, path: &Path) {
    match path.canonicalize() {
        Ok(canonical) => {
            found.insert(canonical);
        }
        Err(err) => tracing::debug!(path = %path.display(), error = %err, "cannot canonicalize"),
    }
}
