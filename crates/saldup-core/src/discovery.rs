//! Identifier discovery: the read-only first phase of a duplication.
//!
//! One walk over the project collects everything the planner needs:
//!
//! - every GUID occurring under the source group, with occurrence counts
//! - every definition ID in the whole project, and the subset whose files
//!   live under the source group
//! - the highest `groupOrderId` across all program files in the project
//! - a classified inventory of the group's files
//!
//! Discovery never writes. Its output is handed to the planner as an
//! immutable snapshot; nothing later in the pipeline feeds back into it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::SaldupError;
use crate::project::{self, FileKind, GUID_PATTERN, ORDER_ATTR, SDSID_TAG};

// ============================================================================
// GUID Registry
// ============================================================================

/// Observed GUIDs under the source group, with occurrence counts.
///
/// Keys are the GUID strings exactly as found (case preserved). Iteration is
/// in sorted order so downstream numbering and reports are reproducible.
#[derive(Debug, Clone, Default)]
pub struct GuidRegistry {
    counts: BTreeMap<String, usize>,
}

impl GuidRegistry {
    /// Record one occurrence of `guid`.
    fn record(&mut self, guid: &str) {
        *self.counts.entry(guid.to_string()).or_insert(0) += 1;
    }

    /// Whether `guid` was observed at least once.
    pub fn contains(&self, guid: &str) -> bool {
        self.counts.contains_key(guid)
    }

    /// Number of distinct GUIDs observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no GUIDs were observed.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Occurrence count for `guid` (zero when never observed).
    pub fn occurrences(&self, guid: &str) -> usize {
        self.counts.get(guid).copied().unwrap_or(0)
    }

    /// The distinct GUIDs in sorted order.
    pub fn guids(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}

// ============================================================================
// Definition Registry
// ============================================================================

/// One registered definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionEntry {
    /// The numeric ID parsed from the file's `<SDSID>` tag.
    pub id: u64,
    /// File stem, for reporting.
    pub name: String,
    /// Absolute path of the source file.
    pub path: PathBuf,
}

/// Definition files keyed by numeric ID, iterated in ascending ID order.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    entries: BTreeMap<u64, DefinitionEntry>,
}

impl DefinitionRegistry {
    /// Insert an entry; returns false (keeping the first entry) on a
    /// duplicate ID.
    fn insert(&mut self, entry: DefinitionEntry) -> bool {
        match self.entries.entry(entry.id) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Highest registered ID, if any.
    pub fn max_id(&self) -> Option<u64> {
        self.entries.keys().next_back().copied()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Look up an entry by ID.
    pub fn get(&self, id: u64) -> Option<&DefinitionEntry> {
        self.entries.get(&id)
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &DefinitionEntry> {
        self.entries.values()
    }
}

// ============================================================================
// Group Inventory
// ============================================================================

/// How a group file is treated during rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Definition file; gets the self-ID tag rewrite only.
    Definition,
    /// Contains at least one GUID; gets ID rules, GUID map, and order value.
    GuidBearing,
    /// No GUIDs; gets ID rules only.
    Plain,
}

/// One file of the source group, classified.
#[derive(Debug, Clone)]
pub struct GroupFile {
    /// Absolute path of the source file.
    pub path: PathBuf,
    pub class: FileClass,
}

/// All files of the source group in sorted path order, backups excluded.
#[derive(Debug, Clone, Default)]
pub struct GroupInventory {
    files: Vec<GroupFile>,
}

impl GroupInventory {
    /// The files in sorted path order.
    pub fn files(&self) -> &[GroupFile] {
        &self.files
    }

    /// Number of files in the group.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Count of files with the given class.
    pub fn count_of(&self, class: FileClass) -> usize {
        self.files.iter().filter(|f| f.class == class).count()
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Everything the planner needs, produced by one read-only pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// GUIDs observed under the source group.
    pub guids: GuidRegistry,
    /// Every definition in the project, keyed by ID.
    pub project_definitions: DefinitionRegistry,
    /// The subset of definitions whose files lie under the source group.
    pub group_definitions: DefinitionRegistry,
    /// Highest `groupOrderId` across the project's program files.
    pub max_order_id: Option<u64>,
    /// Classified files of the source group.
    pub inventory: GroupInventory,
}

/// Scan the project rooted at `root`.
///
/// When `group_dir` is given, GUID scanning, group-scope definition
/// registration, and inventory building are restricted to files under it;
/// without a group only the project-wide registries are populated (the scan
/// subcommand's mode). Backup files are invisible to every scan. Any
/// unreadable file aborts the scan.
pub fn discover(root: &Path, group_dir: Option<&Path>) -> Result<Discovery, SaldupError> {
    let mut discovery = Discovery::default();

    // Collect first, then process in sorted order so IDs and inventory come
    // out the same on every run.
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let at = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            SaldupError::io_at(&at, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if FileKind::from_path(&path) == FileKind::Backup {
            debug!(path = %path.display(), "skipping backup file");
            continue;
        }
        files.push(path);
    }
    files.sort();

    for path in files {
        let kind = FileKind::from_path(&path);
        let in_group = group_dir.is_some_and(|g| project::is_under(&path, g));

        match kind {
            FileKind::Definition => {
                scan_definition(&path, in_group, &mut discovery)?;
                if in_group {
                    discovery.inventory.files.push(GroupFile {
                        path: path.clone(),
                        class: FileClass::Definition,
                    });
                }
            }
            _ => {
                if kind == FileKind::Program {
                    scan_order(&path, &mut discovery)?;
                }
                if in_group {
                    let class = scan_guids(&path, &mut discovery)?;
                    discovery.inventory.files.push(GroupFile {
                        path: path.clone(),
                        class,
                    });
                }
            }
        }
    }

    info!(
        guids = discovery.guids.len(),
        definitions = discovery.project_definitions.len(),
        group_definitions = discovery.group_definitions.len(),
        max_order_id = ?discovery.max_order_id,
        group_files = discovery.inventory.len(),
        "discovery complete"
    );
    Ok(discovery)
}

/// Register a definition file's ID, project-wide and (when applicable)
/// group-scope. Files without a parseable ID tag are skipped.
fn scan_definition(
    path: &Path,
    in_group: bool,
    discovery: &mut Discovery,
) -> Result<(), SaldupError> {
    let content = fs::read_to_string(path).map_err(|e| SaldupError::io_at(path, e))?;
    let Some(id) = content
        .lines()
        .find_map(|line| SDSID_TAG.captures(line))
        .and_then(|caps| caps[1].parse::<u64>().ok())
    else {
        debug!(path = %path.display(), "definition file without an id tag, not registered");
        return Ok(());
    };

    let entry = DefinitionEntry {
        id,
        name: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_path_buf(),
    };

    if !discovery.project_definitions.insert(entry.clone()) {
        let first = discovery
            .project_definitions
            .get(id)
            .map(|e| e.path.display().to_string())
            .unwrap_or_default();
        warn!(
            id,
            first = %first,
            duplicate = %path.display(),
            "duplicate definition id, keeping first"
        );
        return Ok(());
    }
    if in_group {
        discovery.group_definitions.insert(entry);
    }
    Ok(())
}

/// Raise the project-wide order maximum from a program file's first
/// `groupOrderId` attribute, if it has one.
fn scan_order(path: &Path, discovery: &mut Discovery) -> Result<(), SaldupError> {
    let content = fs::read_to_string(path).map_err(|e| SaldupError::io_at(path, e))?;
    let Some(order) = content
        .lines()
        .find_map(|line| ORDER_ATTR.captures(line))
        .and_then(|caps| caps[1].parse::<u64>().ok())
    else {
        return Ok(());
    };
    discovery.max_order_id = Some(match discovery.max_order_id {
        Some(max) => max.max(order),
        None => order,
    });
    Ok(())
}

/// Record every GUID in the file and classify it.
fn scan_guids(path: &Path, discovery: &mut Discovery) -> Result<FileClass, SaldupError> {
    let content = fs::read_to_string(path).map_err(|e| SaldupError::io_at(path, e))?;
    let mut matched = false;
    for found in GUID_PATTERN.find_iter(&content) {
        discovery.guids.record(found.as_str());
        matched = true;
    }
    let class = if matched {
        FileClass::GuidBearing
    } else {
        FileClass::Plain
    };
    debug!(path = %path.display(), class = ?class, "classified group file");
    Ok(class)
}

// ============================================================================
// Tests
// ============================================================================
