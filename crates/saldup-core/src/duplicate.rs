//! Duplication orchestrator: sequences discovery, planning, rewrite, and
//! the manifest patch, and assembles the run report.
//!
//! The phase order is the whole safety story. Discovery finishes before the
//! plan exists, and the plan exists before anything is written, so every
//! substitution applied during rewrite was decided against complete
//! registries. The orchestrator owns that barrier; the phases themselves
//! never reach backward.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::discovery::{self, FileClass};
use crate::error::SaldupError;
use crate::manifest;
use crate::plan;
use crate::project;
use crate::rewrite;

// ============================================================================
// Request
// ============================================================================

/// Everything the pipeline needs to duplicate one group.
#[derive(Debug, Clone)]
pub struct DuplicateRequest {
    /// Absolute project root.
    pub root: PathBuf,
    /// Name of the group to copy.
    pub from: String,
    /// Name of the group to create.
    pub to: String,
    /// Stop after planning; write nothing.
    pub dry_run: bool,
}

// ============================================================================
// Reports
// ============================================================================

/// One definition-ID remapping, as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapEntry {
    pub old_id: u64,
    pub new_id: u64,
    pub name: String,
    /// Destination file, relative to the project root.
    pub new_path: String,
}

/// What happened to the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub manifest: String,
    pub backup: String,
    pub lines_inserted: usize,
}

/// Result of a duplication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicationReport {
    pub from: String,
    pub to: String,
    /// Highest definition ID in the project before the run.
    pub max_definition_id: u64,
    /// Highest `groupOrderId` in the project before the run.
    pub max_order_id: u64,
    /// Order value written into every rewritten program file.
    pub new_order_id: u64,
    /// Number of distinct GUIDs replaced.
    pub guids_remapped: usize,
    /// Definition remaps in ascending old-ID order.
    pub definitions: Vec<RemapEntry>,
    /// Destination files, relative to the project root. On a dry run these
    /// are the files that would have been written.
    pub files_written: Vec<String>,
    /// Absent on a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestSummary>,
    pub dry_run: bool,
    /// ISO 8601 completion time.
    pub completed_at: String,
}

/// Per-group half of a scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    pub files: usize,
    pub definition_files: usize,
    pub guid_bearing_files: usize,
    pub plain_files: usize,
    /// Distinct GUIDs observed in the group.
    pub guids: usize,
    /// The group's definition IDs in ascending order.
    pub definition_ids: Vec<u64>,
}

/// Result of a read-only project scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub root: String,
    pub max_definition_id: u64,
    pub max_order_id: u64,
    /// Number of registered definition files project-wide.
    pub definitions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupSummary>,
    pub completed_at: String,
}

// ============================================================================
// Orchestration
// ============================================================================

/// Run the full duplication pipeline.
///
/// Mutation starts only after discovery and planning are complete. A dry
/// run returns the same report shape with nothing written and no manifest
/// summary.
pub fn duplicate_group(request: &DuplicateRequest) -> Result<DuplicationReport, SaldupError> {
    let root = &request.root;
    let source_dir = root.join(&request.from);
    info!(
        from = %request.from,
        to = %request.to,
        root = %root.display(),
        dry_run = request.dry_run,
        "starting group duplication"
    );

    if !source_dir.is_dir() {
        return Err(SaldupError::GroupNotFound {
            name: request.from.clone(),
            path: source_dir.display().to_string(),
        });
    }
    // Resolve the manifest before mutating anything; a broken root must not
    // leave a half-copied group behind.
    let manifest_path = project::find_manifest(root)?;

    let discovery = discovery::discover(root, Some(&source_dir))?;
    let plan = plan::plan_duplication(&discovery);

    let definitions: Vec<RemapEntry> = plan
        .remaps()
        .map(|remap| RemapEntry {
            old_id: remap.old_id,
            new_id: remap.new_id,
            name: remap.name.clone(),
            new_path: project::rel_display(
                &project::map_group_path(&remap.source_path, &request.from, &request.to),
                root,
            ),
        })
        .collect();

    if request.dry_run {
        let planned = discovery
            .inventory
            .files()
            .iter()
            .map(|file| {
                project::rel_display(
                    &project::map_group_path(&file.path, &request.from, &request.to),
                    root,
                )
            })
            .collect();
        info!("dry run, stopping after planning");
        return Ok(DuplicationReport {
            from: request.from.clone(),
            to: request.to.clone(),
            max_definition_id: discovery.project_definitions.max_id().unwrap_or(0),
            max_order_id: discovery.max_order_id.unwrap_or(0),
            new_order_id: plan.new_order_id(),
            guids_remapped: plan.guid_count(),
            definitions,
            files_written: planned,
            manifest: None,
            dry_run: true,
            completed_at: format_timestamp(SystemTime::now()),
        });
    }

    rewrite::bootstrap_destination(root, &request.to)?;
    let written = rewrite::rewrite_group(&request.from, &request.to, &discovery.inventory, &plan)?;
    let patch = manifest::patch_manifest(&manifest_path, &request.from, &request.to)?;

    info!(
        files = written.len(),
        definitions = definitions.len(),
        guids = plan.guid_count(),
        "group duplication complete"
    );
    Ok(DuplicationReport {
        from: request.from.clone(),
        to: request.to.clone(),
        max_definition_id: discovery.project_definitions.max_id().unwrap_or(0),
        max_order_id: discovery.max_order_id.unwrap_or(0),
        new_order_id: plan.new_order_id(),
        guids_remapped: plan.guid_count(),
        definitions,
        files_written: written.iter().map(|p| project::rel_display(p, root)).collect(),
        manifest: Some(ManifestSummary {
            manifest: project::rel_display(&patch.manifest, root),
            backup: project::rel_display(&patch.backup, root),
            lines_inserted: patch.lines_inserted,
        }),
        dry_run: false,
        completed_at: format_timestamp(SystemTime::now()),
    })
}

/// Run discovery only and summarize the registries.
pub fn scan_project(root: &Path, group: Option<&str>) -> Result<ScanReport, SaldupError> {
    let group_dir = group.map(|name| root.join(name));
    if let (Some(name), Some(dir)) = (group, group_dir.as_deref()) {
        if !dir.is_dir() {
            return Err(SaldupError::GroupNotFound {
                name: name.to_string(),
                path: dir.display().to_string(),
            });
        }
    }
    let discovery = discovery::discover(root, group_dir.as_deref())?;

    let group_summary = group.map(|name| GroupSummary {
        group: name.to_string(),
        files: discovery.inventory.len(),
        definition_files: discovery.inventory.count_of(FileClass::Definition),
        guid_bearing_files: discovery.inventory.count_of(FileClass::GuidBearing),
        plain_files: discovery.inventory.count_of(FileClass::Plain),
        guids: discovery.guids.len(),
        definition_ids: discovery.group_definitions.iter().map(|e| e.id).collect(),
    });
    Ok(ScanReport {
        root: root.display().to_string(),
        max_definition_id: discovery.project_definitions.max_id().unwrap_or(0),
        max_order_id: discovery.max_order_id.unwrap_or(0),
        definitions: discovery.project_definitions.len(),
        group: group_summary,
        completed_at: format_timestamp(SystemTime::now()),
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Format a timestamp for JSON output (ISO 8601).
fn format_timestamp(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Tests
// ============================================================================
