//! Precondition checks for the CLI layer.
//!
//! Everything here runs before the core pipeline touches the filesystem:
//! the project root must be a real SAL project, group names must satisfy
//! the naming rule, the source group must exist, and the destination must
//! not. The checks only look; mutation is the core's job.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use saldup_core::error::SaldupError;
use saldup_core::project::{find_manifest, MARKER_FILE};

// ============================================================================
// Group Name Rule
// ============================================================================

/// A group name: a letter followed by letters, digits, or underscores.
static GROUP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Check a group name against the naming rule.
pub fn check_group_name(name: &str) -> Result<(), SaldupError> {
    if name.is_empty() {
        return Err(SaldupError::group_name(name, "name is empty"));
    }
    if GROUP_NAME.is_match(name) {
        return Ok(());
    }
    let reason = if name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        "may contain only letters, digits, and underscores"
    } else {
        "must start with a letter"
    };
    Err(SaldupError::group_name(name, reason))
}

// ============================================================================
// Project Root
// ============================================================================

/// Resolve and vet the project root directory.
///
/// The directory must exist and carry the `project.sacfg` marker. Returns
/// the canonicalized root so every later path is absolute.
pub fn resolve_project_root(dir: &Path) -> Result<PathBuf, SaldupError> {
    if !dir.is_dir() {
        return Err(SaldupError::ProjectNotFound {
            path: dir.display().to_string(),
        });
    }
    let root = dir.canonicalize().map_err(|e| SaldupError::io_at(dir, e))?;
    if !root.join(MARKER_FILE).is_file() {
        return Err(SaldupError::MarkerMissing {
            marker: MARKER_FILE.to_string(),
            root: root.display().to_string(),
        });
    }
    Ok(root)
}

// ============================================================================
// Duplication Preconditions
// ============================================================================

/// Check everything a duplication needs before the core runs.
///
/// The core re-checks the filesystem half of these on its own, so a race
/// between check and run still fails before anything is written.
pub fn check_duplicate(root: &Path, from: &str, to: &str) -> Result<(), SaldupError> {
    check_group_name(from)?;
    check_group_name(to)?;
    if from == to {
        return Err(SaldupError::invalid_args(format!(
            "source and destination groups must differ, both are '{}'",
            from
        )));
    }
    find_manifest(root)?;
    let source = root.join(from);
    if !source.is_dir() {
        return Err(SaldupError::GroupNotFound {
            name: from.to_string(),
            path: source.display().to_string(),
        });
    }
    let destination = root.join(to);
    if destination.exists() {
        return Err(SaldupError::DestinationExists {
            path: destination.display().to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Plant.salproj"), "<Project/>").unwrap();
        fs::write(dir.path().join("project.sacfg"), "").unwrap();
        fs::create_dir(dir.path().join("GroupA")).unwrap();
        dir
    }

    mod group_names {
        use super::*;

        #[test]
        fn plain_and_underscored_names_pass() {
            assert!(check_group_name("GroupA").is_ok());
            assert!(check_group_name("pump_station_2").is_ok());
            assert!(check_group_name("X").is_ok());
        }

        #[test]
        fn empty_name_is_rejected() {
            let err = check_group_name("").unwrap_err();
            assert!(matches!(err, SaldupError::GroupNameInvalid { .. }));
        }

        #[test]
        fn leading_digit_is_rejected() {
            let err = check_group_name("2Fast").unwrap_err();
            assert!(err.to_string().contains("must start with a letter"));
        }

        #[test]
        fn leading_underscore_is_rejected() {
            assert!(check_group_name("_hidden").is_err());
        }

        #[test]
        fn separator_characters_are_rejected() {
            let err = check_group_name("Group-A").unwrap_err();
            assert!(err.to_string().contains("letters, digits, and underscores"));
            assert!(check_group_name("Group A").is_err());
        }
    }

    mod project_roots {
        use super::*;

        #[test]
        fn valid_root_resolves_to_absolute_path() {
            let dir = project();
            let root = resolve_project_root(dir.path()).unwrap();
            assert!(root.is_absolute());
            assert!(root.join("project.sacfg").is_file());
        }

        #[test]
        fn missing_directory_is_rejected() {
            let err = resolve_project_root(Path::new("/no/such/project")).unwrap_err();
            assert!(matches!(err, SaldupError::ProjectNotFound { .. }));
        }

        #[test]
        fn missing_marker_is_rejected() {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("Plant.salproj"), "").unwrap();
            let err = resolve_project_root(dir.path()).unwrap_err();
            assert!(matches!(err, SaldupError::MarkerMissing { .. }));
        }
    }

    mod duplication_preconditions {
        use super::*;

        #[test]
        fn well_formed_request_passes() {
            let dir = project();
            assert!(check_duplicate(dir.path(), "GroupA", "GroupB").is_ok());
        }

        #[test]
        fn identical_names_are_rejected() {
            let dir = project();
            let err = check_duplicate(dir.path(), "GroupA", "GroupA").unwrap_err();
            assert!(matches!(err, SaldupError::InvalidArguments { .. }));
        }

        #[test]
        fn bad_destination_name_is_rejected() {
            let dir = project();
            let err = check_duplicate(dir.path(), "GroupA", "Group B").unwrap_err();
            assert!(matches!(err, SaldupError::GroupNameInvalid { .. }));
        }

        #[test]
        fn ambiguous_manifest_is_rejected() {
            let dir = project();
            fs::write(dir.path().join("Second.salproj"), "").unwrap();
            let err = check_duplicate(dir.path(), "GroupA", "GroupB").unwrap_err();
            assert!(matches!(err, SaldupError::ManifestAmbiguous { .. }));
        }

        #[test]
        fn missing_source_group_is_rejected() {
            let dir = project();
            let err = check_duplicate(dir.path(), "GroupC", "GroupB").unwrap_err();
            assert!(matches!(err, SaldupError::GroupNotFound { .. }));
        }

        #[test]
        fn existing_destination_is_rejected() {
            let dir = project();
            fs::create_dir(dir.path().join("GroupB")).unwrap();
            let err = check_duplicate(dir.path(), "GroupA", "GroupB").unwrap_err();
            assert!(matches!(err, SaldupError::DestinationExists { .. }));
        }
    }
}
