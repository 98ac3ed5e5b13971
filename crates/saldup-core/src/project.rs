//! Project layout conventions and path utilities.
//!
//! This module pins down the on-disk dialect of a SAL project: file
//! extensions, the configuration marker, the identifier tags and attributes
//! the scanner looks for, and the path rules that relate a source group to
//! its duplicate. Everything else in the crate goes through these
//! definitions rather than spelling out literals.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SaldupError;

// ============================================================================
// Dialect Constants
// ============================================================================

/// Extension of the single project manifest file (without dot).
pub const MANIFEST_EXTENSION: &str = "salproj";

/// Configuration marker file expected in the project root.
pub const MARKER_FILE: &str = "project.sacfg";

/// Extension of data-point definition files (without dot).
pub const DEFINITION_EXTENSION: &str = "sds";

/// Extension of program and diagram files (without dot).
pub const PROGRAM_EXTENSION: &str = "sal";

/// Extension of backup files, excluded from every scan (without dot).
pub const BACKUP_EXTENSION: &str = "bak";

/// Subdirectory every group carries, created empty in a fresh duplicate.
pub const ALIAS_SUBDIR: &str = "Alias Devices";

/// File name suffix marking a diagram program file.
pub const DIAGRAM_SUFFIX: &str = "Diagram.sal";

// ============================================================================
// Scan Patterns
// ============================================================================

/// Canonical 8-4-4-4-12 GUID, case-insensitive hex.
pub static GUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

/// Self-identifying numeric ID tag of a definition file.
pub static SDSID_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<SDSID>(\d+)</SDSID>").unwrap());

/// Group ordering attribute carried by program inclusion elements.
pub static ORDER_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"groupOrderId="(\d+)""#).unwrap());

// ============================================================================
// File Kinds
// ============================================================================

/// Role of a file within a SAL project, keyed on its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Data-point definition file (.sds).
    Definition,
    /// Program or diagram file (.sal).
    Program,
    /// Project manifest (.salproj).
    Manifest,
    /// Backup file (.bak), never scanned or copied.
    Backup,
    /// Anything else; treated as opaque text during duplication.
    Other,
}

impl FileKind {
    /// Detect the file kind from the extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(DEFINITION_EXTENSION) => FileKind::Definition,
            Some(ext) if ext.eq_ignore_ascii_case(PROGRAM_EXTENSION) => FileKind::Program,
            Some(ext) if ext.eq_ignore_ascii_case(MANIFEST_EXTENSION) => FileKind::Manifest,
            Some(ext) if ext.eq_ignore_ascii_case(BACKUP_EXTENSION) => FileKind::Backup,
            _ => FileKind::Other,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Definition => write!(f, "definition"),
            FileKind::Program => write!(f, "program"),
            FileKind::Manifest => write!(f, "manifest"),
            FileKind::Backup => write!(f, "backup"),
            FileKind::Other => write!(f, "other"),
        }
    }
}

// ============================================================================
// Path Containment
// ============================================================================

/// Check whether `path` lies at or under `ancestor`.
///
/// Pure component-wise comparison; both paths must already be absolute and
/// normalized the same way (the pipeline only ever hands absolute paths
/// built from one project root through here). The current working directory
/// plays no part.
pub fn is_under(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

// ============================================================================
// Group Path Mapping
// ============================================================================

/// Derive the duplicate's path for a source path.
///
/// Directory components equal to `old_group` become `new_group`; within the
/// final file-name component every occurrence of `old_group` is substituted,
/// so `GroupA/GroupADiagram.sal` maps to `GroupB/GroupBDiagram.sal`. Mapping
/// an already-mapped path is a no-op as long as the destination name does
/// not itself embed the source name.
pub fn map_group_path(path: &Path, old_group: &str, new_group: &str) -> PathBuf {
    let mut mapped = PathBuf::new();
    let mut components = path.components().peekable();
    while let Some(component) = components.next() {
        let is_last = components.peek().is_none();
        match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                if is_last {
                    mapped.push(name.replace(old_group, new_group));
                } else if name == old_group {
                    mapped.push(new_group);
                } else {
                    mapped.push(name.as_ref());
                }
            }
            other => mapped.push(other.as_os_str()),
        }
    }
    mapped
}

/// Render a path relative to `root` with forward slashes, for reports.
pub fn rel_display(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

// ============================================================================
// Manifest Location
// ============================================================================

/// Find the single `*.salproj` manifest directly in the project root.
///
/// Zero manifests and more than one are both hard errors; the patcher needs
/// an unambiguous target.
pub fn find_manifest(root: &Path) -> Result<PathBuf, SaldupError> {
    let mut manifests: Vec<PathBuf> = Vec::new();
    let entries = fs::read_dir(root).map_err(|e| SaldupError::io_at(root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| SaldupError::io_at(root, e))?;
        let path = entry.path();
        if path.is_file() && FileKind::from_path(&path) == FileKind::Manifest {
            manifests.push(path);
        }
    }
    manifests.sort();
    match manifests.len() {
        0 => Err(SaldupError::ManifestMissing {
            root: root.display().to_string(),
        }),
        1 => Ok(manifests.remove(0)),
        count => Err(SaldupError::ManifestAmbiguous {
            root: root.display().to_string(),
            count,
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
