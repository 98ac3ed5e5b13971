//! Manifest patcher: adds the duplicate group's entries to the project
//! manifest.
//!
//! The manifest is never parsed as XML. The patcher moves it aside as a
//! `.bak` sibling, then streams the backup line by line into a fresh file at
//! the original path. Every line passes through verbatim; along the way:
//!
//! - each inclusion entry of the old group is copied, with the group name
//!   substituted, into a staging buffer
//! - a staged diagram entry gets three companion lines so the element stays
//!   well-formed: a visibility marker, a depends-upon back-reference, and
//!   the element's closing tag
//! - the whole buffer is flushed immediately before the line that closes
//!   the inclusion block
//!
//! The manifest is assumed to hold one inclusion block. Entries staged
//! after the last block close never flush; the patcher warns and drops
//! them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::SaldupError;
use crate::project::DIAGRAM_SUFFIX;

// ============================================================================
// Line Patterns
// ============================================================================

/// Path argument of an inclusion entry.
static INCLUDE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Include="([^"]+)""#).unwrap());

/// Leading whitespace and element name of an inclusion entry.
static ELEMENT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)<([A-Za-z][A-Za-z0-9]*)\b").unwrap());

/// Closing marker of the inclusion block.
const BLOCK_CLOSE: &str = "</ItemGroup>";

// ============================================================================
// Patch Result
// ============================================================================

/// What the patcher did, for the run report.
#[derive(Debug, Clone)]
pub struct ManifestPatch {
    /// The rewritten manifest.
    pub manifest: PathBuf,
    /// The backup holding the pre-patch content.
    pub backup: PathBuf,
    /// Number of lines added to the manifest.
    pub lines_inserted: usize,
}

// ============================================================================
// Patching
// ============================================================================

/// Patch `manifest` so the duplicate group's files are included.
///
/// The pre-patch content survives as `<manifest>.bak`; a stale backup from
/// an earlier run is replaced.
pub fn patch_manifest(
    manifest: &Path,
    old_group: &str,
    new_group: &str,
) -> Result<ManifestPatch, SaldupError> {
    let backup = backup_path(manifest);
    if backup.exists() {
        debug!(backup = %backup.display(), "removing stale manifest backup");
        fs::remove_file(&backup).map_err(|e| SaldupError::io_at(&backup, e))?;
    }
    fs::rename(manifest, &backup).map_err(|e| SaldupError::io_at(manifest, e))?;

    let content = fs::read_to_string(&backup).map_err(|e| SaldupError::io_at(&backup, e))?;
    let (patched, lines_inserted) = insert_group_entries(&content, old_group, new_group);
    fs::write(manifest, patched).map_err(|e| SaldupError::io_at(manifest, e))?;

    info!(
        manifest = %manifest.display(),
        lines_inserted,
        "manifest patched"
    );
    Ok(ManifestPatch {
        manifest: manifest.to_path_buf(),
        backup,
        lines_inserted,
    })
}

/// Sibling path with `.bak` appended to the full file name.
fn backup_path(manifest: &Path) -> PathBuf {
    let mut name = manifest.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// The streaming pass over the manifest content.
fn insert_group_entries(content: &str, old_group: &str, new_group: &str) -> (String, usize) {
    let include_marker = format!("Include=\"{}\\", old_group);
    let mut out = String::with_capacity(content.len());
    let mut staged: Vec<String> = Vec::new();
    let mut inserted = 0usize;

    for line in content.split_inclusive('\n') {
        if line.contains(BLOCK_CLOSE) {
            inserted += staged.len();
            for entry in staged.drain(..) {
                out.push_str(&entry);
            }
        }
        out.push_str(line);

        if line.contains(&include_marker) {
            stage_entry(line, old_group, new_group, &mut staged);
        }
    }

    if !staged.is_empty() {
        warn!(
            entries = staged.len(),
            "staged manifest entries found no closing inclusion block, dropping"
        );
    }
    (out, inserted)
}

/// Stage the new-group copy of one inclusion line, plus diagram companions
/// when the included file is a diagram.
fn stage_entry(line: &str, old_group: &str, new_group: &str, staged: &mut Vec<String>) {
    let entry = line.replace(old_group, new_group);
    let is_diagram = included_file_name(&entry)
        .map(|name| name.ends_with(DIAGRAM_SUFFIX))
        .unwrap_or(false);

    if !is_diagram {
        staged.push(entry);
        return;
    }

    let (body, terminator) = split_line_terminator(&entry);
    let (indent, element) = match ELEMENT_OPEN.captures(body) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => {
            staged.push(entry);
            return;
        }
    };
    let base = included_file_name(&entry)
        .and_then(|name| name.strip_suffix(DIAGRAM_SUFFIX))
        .unwrap_or_default()
        .to_string();

    staged.push(entry.clone());
    staged.push(format!("{}  <Visible>false</Visible>{}", indent, terminator));
    staged.push(format!(
        "{}  <DependentUpon>{}.sal</DependentUpon>{}",
        indent, base, terminator
    ));
    staged.push(format!("{}</{}>{}", indent, element, terminator));
}

/// File-name component of the line's `Include` path, if it has one.
fn included_file_name(line: &str) -> Option<&str> {
    let caps = INCLUDE_PATH.captures(line)?;
    let path = caps.get(1)?.as_str();
    Some(path.rsplit(['\\', '/']).next().unwrap_or(path))
}

/// Split a piece produced by `split_inclusive` into body and terminator.
fn split_line_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

// ============================================================================
// Tests
// ============================================================================
