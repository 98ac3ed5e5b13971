//! Rewrite engine: copies the group's files to their new paths with every
//! planned identifier change applied.
//!
//! Files are rewritten line by line. `split_inclusive` keeps each line's
//! terminator attached, so LF, CRLF, and a missing final newline all
//! round-trip byte-identically when no rule touches the line.
//!
//! What gets applied depends on the file's class:
//!
//! - definition files: only the file's own `<SDSID>` / `<ConnectionSDSID>`
//!   tags, old self-ID to new
//! - plain files: the definition-ID substitution rules
//! - GUID-bearing files: the rules, then the GUID map, then the new
//!   `groupOrderId`

use std::fs;
use std::path::{Path, PathBuf};

use regex::Captures;
use tracing::{debug, info};

use crate::discovery::{FileClass, GroupInventory};
use crate::error::SaldupError;
use crate::plan::DuplicationPlan;
use crate::project::{self, ALIAS_SUBDIR, GUID_PATTERN, ORDER_ATTR, SDSID_TAG};

// ============================================================================
// Destination Bootstrap
// ============================================================================

/// Create the destination group directory and its `Alias Devices` subtree.
///
/// Refuses to touch a destination that already exists; a half-written
/// duplicate from an aborted run must be removed by the operator first.
pub fn bootstrap_destination(root: &Path, new_group: &str) -> Result<PathBuf, SaldupError> {
    let dest = root.join(new_group);
    if dest.exists() {
        return Err(SaldupError::DestinationExists {
            path: dest.display().to_string(),
        });
    }
    fs::create_dir_all(dest.join(ALIAS_SUBDIR)).map_err(|e| SaldupError::io_at(&dest, e))?;
    debug!(dest = %dest.display(), "destination group created");
    Ok(dest)
}

// ============================================================================
// Group Rewrite
// ============================================================================

/// Duplicate every inventory file under its mapped destination path.
///
/// Returns the destination paths in the order they were written (inventory
/// order, which is sorted by source path).
pub fn rewrite_group(
    old_group: &str,
    new_group: &str,
    inventory: &GroupInventory,
    plan: &DuplicationPlan,
) -> Result<Vec<PathBuf>, SaldupError> {
    let mut written = Vec::with_capacity(inventory.len());
    for file in inventory.files() {
        let dest = project::map_group_path(&file.path, old_group, new_group);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SaldupError::io_at(parent, e))?;
        }
        let content =
            fs::read_to_string(&file.path).map_err(|e| SaldupError::io_at(&file.path, e))?;
        let rewritten = match file.class {
            FileClass::Definition => rewrite_definition(&content, plan),
            FileClass::Plain => rewrite_plain(&content, plan),
            FileClass::GuidBearing => rewrite_guid_bearing(&content, plan),
        };
        fs::write(&dest, rewritten).map_err(|e| SaldupError::io_at(&dest, e))?;
        debug!(
            source = %file.path.display(),
            dest = %dest.display(),
            class = ?file.class,
            "file duplicated"
        );
        written.push(dest);
    }
    info!(files = written.len(), "group files duplicated");
    Ok(written)
}

// ============================================================================
// Per-class Transforms
// ============================================================================

/// Apply `transform` per line, keeping each line's terminator bytes.
fn rewrite_lines(content: &str, mut transform: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        out.push_str(&transform(line));
    }
    out
}

/// Rewrite a definition file's own ID tags to the planned new ID.
///
/// A file that never made it into the registry (no tag, or the loser of a
/// duplicate ID) is copied verbatim.
fn rewrite_definition(content: &str, plan: &DuplicationPlan) -> String {
    let Some(old_id) = content
        .lines()
        .find_map(|line| SDSID_TAG.captures(line))
        .and_then(|caps| caps[1].parse::<u64>().ok())
    else {
        return content.to_string();
    };
    let Some(new_id) = plan.new_id_for(old_id) else {
        return content.to_string();
    };

    let seek_id = format!("<SDSID>{}</SDSID>", old_id);
    let replace_id = format!("<SDSID>{}</SDSID>", new_id);
    let seek_conn = format!("<ConnectionSDSID>{}</ConnectionSDSID>", old_id);
    let replace_conn = format!("<ConnectionSDSID>{}</ConnectionSDSID>", new_id);
    rewrite_lines(content, |line| {
        line.replace(&seek_id, &replace_id)
            .replace(&seek_conn, &replace_conn)
    })
}

/// Rewrite a file with no GUIDs: substitution rules only.
fn rewrite_plain(content: &str, plan: &DuplicationPlan) -> String {
    rewrite_lines(content, |line| plan.rules().apply(line))
}

/// Rewrite a GUID-bearing file: rules, then GUID map, then order value.
fn rewrite_guid_bearing(content: &str, plan: &DuplicationPlan) -> String {
    let order_replacement = format!(r#"groupOrderId="{}""#, plan.new_order_id());
    rewrite_lines(content, |line| {
        let line = plan.rules().apply(line);
        // Every GUID here was observed during discovery; an unmapped one can
        // only mean the file changed underneath us, so leave it alone.
        let line = GUID_PATTERN.replace_all(&line, |caps: &Captures| {
            let found = &caps[0];
            plan.replacement_guid(found).unwrap_or(found).to_string()
        });
        ORDER_ATTR
            .replace_all(&line, order_replacement.as_str())
            .into_owned()
    })
}

// ============================================================================
// Tests
// ============================================================================
