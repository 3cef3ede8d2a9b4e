//! Path resolution for partially typed fragments
//!
//! The user may have typed a path that does not exist yet (`src/comp` while
//! only `src/` exists). The resolver walks up until it reaches a directory
//! that exists, lists that directory, and hands the rest of the fragment to
//! the selector as its initial query.

use std::path::{Path, PathBuf};

use tracing::trace;

/// Result of resolving a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Deepest existing directory, normalized (`.` for the current directory,
    /// no trailing separator except for `/`)
    pub existing_prefix: String,
    /// Remainder of the fragment after `existing_prefix`, without leading separators
    pub leftover_suffix: String,
}

impl ResolvedPath {
    /// The existing prefix as a path
    pub fn as_path(&self) -> &Path {
        Path::new(&self.existing_prefix)
    }
}

/// Resolves fragments against a working directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Directory relative fragments are resolved against
    cwd: PathBuf,
}

impl PathResolver {
    /// Create a resolver for relative paths under `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Split `fragment` into the deepest existing directory and the leftover.
    ///
    /// The candidate directory only ever gets shorter, so the walk ends at
    /// the latest when it reaches the empty string (the current directory).
    /// Directories that cannot be stat'ed count as missing.
    ///
    /// # Arguments
    /// * `fragment` - Unquoted text typed so far
    ///
    /// # Returns
    /// * `ResolvedPath` - Existing prefix and leftover suffix
    pub fn resolve(&self, fragment: &str) -> ResolvedPath {
        let mut dir = fragment;
        while !dir.is_empty() && !self.is_dir(dir) {
            dir = parent_of(dir);
        }

        let leftover = fragment
            .strip_prefix(dir)
            .unwrap_or(fragment)
            .trim_start_matches('/');

        let resolved = ResolvedPath {
            existing_prefix: normalize(dir),
            leftover_suffix: leftover.to_string(),
        };
        trace!(
            fragment,
            prefix = %resolved.existing_prefix,
            leftover = %resolved.leftover_suffix,
            "Resolved path fragment"
        );
        resolved
    }

    fn is_dir(&self, dir: &str) -> bool {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.is_dir()
        } else {
            self.cwd.join(path).is_dir()
        }
    }
}

/// Text up to and including the last separator, ignoring trailing separators.
fn parent_of(dir: &str) -> &str {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        return "";
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[..=i],
        None => "",
    }
}

fn normalize(dir: &str) -> String {
    if dir.is_empty() {
        return ".".to_string();
    }
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether a fragment should be treated as a filesystem path
pub fn looks_like_path(fragment: &str) -> bool {
    fragment.contains('/') || fragment.starts_with('~')
}

/// Expand a leading `~` or `~/` to the home directory.
///
/// `~user` forms are left alone.
pub fn expand_tilde(fragment: &str) -> String {
    let rest = if fragment == "~" {
        Some("")
    } else {
        fragment.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => {
            let home = home.to_string_lossy();
            let home = home.trim_end_matches('/');
            format!("{home}/{rest}")
        }
        _ => fragment.to_string(),
    }
}
