//! Built-in candidate producers
//!
//! These run as `fzcomp compgen <kind>` so that, like any user command, their
//! output streams into the selector while they are still running.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

/// Kinds of built-in producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompgenKind {
    /// Files and directories below a directory
    Path,
    /// Directories below a directory
    Dir,
    /// Known host names
    Hosts,
    /// Environment variable names
    Env,
}

/// Write the candidates of `kind` to `out`, one per line
///
/// # Arguments
/// * `kind` - Producer to run
/// * `root` - Directory to list for `path` and `dir` (defaults to `.`)
/// * `out` - Destination
pub fn run<W: Write>(kind: CompgenKind, root: Option<&Path>, out: &mut W) -> io::Result<()> {
    let root = root.unwrap_or_else(|| Path::new("."));
    match kind {
        CompgenKind::Path => walk(root, false, out),
        CompgenKind::Dir => walk(root, true, out),
        CompgenKind::Hosts => {
            for host in known_hosts() {
                writeln!(out, "{host}")?;
            }
            Ok(())
        }
        CompgenKind::Env => {
            for name in env_names() {
                writeln!(out, "{name}")?;
            }
            Ok(())
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Recursively list `root`, skipping hidden entries and unreadable directories.
///
/// Paths are printed as they would be typed: relative to the current directory
/// when `root` is `.`, otherwise prefixed with `root`.
pub fn walk<W: Write>(root: &Path, dirs_only: bool, out: &mut W) -> io::Result<()> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                trace!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if dirs_only && !entry.file_type().is_dir() {
            continue;
        }

        let path = if root == Path::new(".") {
            entry.path().strip_prefix(".").unwrap_or(entry.path())
        } else {
            entry.path()
        };
        writeln!(out, "{}", path.to_string_lossy())?;
    }

    Ok(())
}

/// Host names from `~/.ssh/config`, `~/.ssh/known_hosts` and `/etc/hosts`
pub fn known_hosts() -> BTreeSet<String> {
    let mut hosts = BTreeSet::new();
    let read = |path: &Path| fs::read_to_string(path).unwrap_or_default();

    if let Some(home) = dirs::home_dir() {
        hosts.extend(parse_ssh_config(&read(&home.join(".ssh/config"))));
        hosts.extend(parse_known_hosts(&read(&home.join(".ssh/known_hosts"))));
    }
    hosts.extend(parse_etc_hosts(&read(Path::new("/etc/hosts"))));

    hosts
}

/// `Host` patterns without wildcards and `HostName` values
pub fn parse_ssh_config(text: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    for line in text.lines() {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else { continue };

        if keyword.eq_ignore_ascii_case("host") {
            hosts.extend(
                words
                    .filter(|w| !w.contains(['*', '?']) && !w.starts_with('!'))
                    .map(str::to_string),
            );
        } else if keyword.eq_ignore_ascii_case("hostname") {
            hosts.extend(words.next().map(str::to_string));
        }
    }
    hosts
}

/// Host names from a `known_hosts` file; hashed entries are skipped
pub fn parse_known_hosts(text: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let mut first = match fields.next() {
            Some(f) if !f.starts_with('#') => f,
            _ => continue,
        };
        // @cert-authority, @revoked
        if first.starts_with('@') {
            match fields.next() {
                Some(f) => first = f,
                None => continue,
            }
        }

        for name in first.split(',') {
            if name.is_empty() || name.starts_with('|') {
                continue;
            }
            let name = match name.strip_prefix('[') {
                Some(rest) => rest.split(']').next().unwrap_or(rest),
                None => name,
            };
            if !name.contains(['*', '?']) {
                hosts.push(name.to_string());
            }
        }
    }
    hosts
}

/// Names from `/etc/hosts`, ignoring `0.0.0.0` block entries
pub fn parse_etc_hosts(text: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("");
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("0.0.0.0") | None => continue,
            Some(_) => hosts.extend(fields.map(str::to_string)),
        }
    }
    hosts
}

/// Sorted environment variable names
pub fn env_names() -> BTreeSet<String> {
    std::env::vars_os()
        .map(|(key, _)| key.to_string_lossy().into_owned())
        .collect()
}
