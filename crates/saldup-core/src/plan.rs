//! Remapping planner: decides every new identifier before anything is
//! written.
//!
//! The plan is a pure function of discovery output. Definition IDs are
//! minted sequentially above the project-wide maximum, walking the group's
//! old IDs in ascending order, so the assignment is reproducible run to
//! run. GUID replacements are freshly generated and checked against both
//! the observed set and each other; only their uniqueness is reproducible,
//! not their values.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use crate::discovery::Discovery;
use crate::subst::SubstitutionSet;

// ============================================================================
// Plan Types
// ============================================================================

/// One definition-ID remapping decided by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRemap {
    pub old_id: u64,
    pub new_id: u64,
    /// Definition name (file stem), for reporting.
    pub name: String,
    /// Source definition file the remap belongs to.
    pub source_path: PathBuf,
}

/// The complete, immutable remapping decision for one duplication.
#[derive(Debug, Clone, Default)]
pub struct DuplicationPlan {
    guid_map: HashMap<String, String>,
    id_map: BTreeMap<u64, IdRemap>,
    rules: SubstitutionSet,
    new_order_id: u64,
    resulting_max_id: u64,
}

impl DuplicationPlan {
    /// Replacement for an observed GUID, if one was planned.
    pub fn replacement_guid(&self, guid: &str) -> Option<&str> {
        self.guid_map.get(guid).map(String::as_str)
    }

    /// Number of GUIDs that will be replaced.
    pub fn guid_count(&self) -> usize {
        self.guid_map.len()
    }

    /// New ID for an old group-scope definition ID.
    pub fn new_id_for(&self, old_id: u64) -> Option<u64> {
        self.id_map.get(&old_id).map(|r| r.new_id)
    }

    /// The definition remaps in ascending old-ID order.
    pub fn remaps(&self) -> impl Iterator<Item = &IdRemap> {
        self.id_map.values()
    }

    /// Number of definition IDs that will be remapped.
    pub fn remap_count(&self) -> usize {
        self.id_map.len()
    }

    /// The literal substitution rules derived from the ID remapping.
    pub fn rules(&self) -> &SubstitutionSet {
        &self.rules
    }

    /// The order value every rewritten program file receives.
    pub fn new_order_id(&self) -> u64 {
        self.new_order_id
    }

    /// Highest definition ID in the project once the duplicate exists.
    pub fn resulting_max_id(&self) -> u64 {
        self.resulting_max_id
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Compute the remapping plan from completed discovery output.
pub fn plan_duplication(discovery: &Discovery) -> DuplicationPlan {
    let new_order_id = discovery.max_order_id.unwrap_or(0) + 1;

    // Definition IDs: mint above the project maximum, ascending old order.
    let project_max = discovery.project_definitions.max_id().unwrap_or(0);
    let mut next_id = project_max;
    let mut id_map = BTreeMap::new();
    let mut rules = SubstitutionSet::new();
    for entry in discovery.group_definitions.iter() {
        next_id += 1;
        rules.push(format!("SdsId{}", entry.id), format!("SdsId{}", next_id));
        rules.push(
            format!(r#"sdsId="{}""#, entry.id),
            format!(r#"sdsId="{}""#, next_id),
        );
        debug!(old_id = entry.id, new_id = next_id, name = %entry.name, "planned id remap");
        id_map.insert(
            entry.id,
            IdRemap {
                old_id: entry.id,
                new_id: next_id,
                name: entry.name.clone(),
                source_path: entry.path.clone(),
            },
        );
    }

    // GUIDs: fresh v4 values, none colliding with anything observed or
    // already assigned. Comparison is case-insensitive; the dialect treats
    // GUIDs as case-preserving but not case-significant.
    let observed: HashSet<String> = discovery
        .guids
        .guids()
        .map(|g| g.to_ascii_lowercase())
        .collect();
    let mut assigned: HashSet<String> = HashSet::new();
    let mut guid_map = HashMap::new();
    for guid in discovery.guids.guids() {
        let replacement = mint_guid(&observed, &assigned);
        assigned.insert(replacement.clone());
        guid_map.insert(guid.to_string(), replacement);
    }

    DuplicationPlan {
        guid_map,
        id_map,
        rules,
        new_order_id,
        resulting_max_id: next_id,
    }
}

/// Generate a v4 GUID distinct from every observed and assigned value.
fn mint_guid(observed: &HashSet<String>, assigned: &HashSet<String>) -> String {
    loop {
        let candidate = Uuid::new_v4().to_string();
        if !observed.contains(&candidate) && !assigned.contains(&candidate) {
            return candidate;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::discover;
    use crate::project::GUID_PATTERN;
    use std::fs;
    use tempfile::TempDir;

    /// Project with group definitions 3 and 5, an outside definition 9,
    /// and two GUIDs inside the group.
    fn fixture() -> (TempDir, Discovery) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let group = root.join("GroupA");
        fs::create_dir_all(&group).unwrap();
        fs::write(group.join("Valve.sds"), "<SDSID>3</SDSID>\n").unwrap();
        fs::write(group.join("Pump.sds"), "<SDSID>5</SDSID>\n").unwrap();
        fs::write(
            group.join("GroupA.sal"),
            concat!(
                "<Program guid=\"3fa85f64-5717-4562-b3fc-2c963f66afa6\" groupOrderId=\"2\">\n",
                "  <Ref guid=\"AAAAAAAA-BBBB-4CCC-8DDD-EEEEEEEEEEEE\"/>\n",
                "</Program>\n",
            ),
        )
        .unwrap();
        fs::create_dir_all(root.join("Shared")).unwrap();
        fs::write(root.join("Shared").join("Tank.sds"), "<SDSID>9</SDSID>\n").unwrap();
        fs::write(
            root.join("Shared").join("Shared.sal"),
            "<Source groupOrderId=\"6\"/>\n",
        )
        .unwrap();
        let discovery = discover(root, Some(&group)).unwrap();
        (dir, discovery)
    }

    mod definition_ids {
        use super::*;

        #[test]
        fn minted_above_project_max_in_ascending_order() {
            let (_dir, discovery) = fixture();
            let plan = plan_duplication(&discovery);
            assert_eq!(plan.new_id_for(3), Some(10));
            assert_eq!(plan.new_id_for(5), Some(11));
            assert_eq!(plan.new_id_for(9), None);
            assert_eq!(plan.resulting_max_id(), 11);
            assert_eq!(plan.remap_count(), 2);
        }

        #[test]
        fn rules_carry_both_textual_forms() {
            let (_dir, discovery) = fixture();
            let plan = plan_duplication(&discovery);
            let rules = plan.rules();
            assert_eq!(rules.len(), 4);
            assert_eq!(rules.apply("SdsId3 sdsId=\"5\""), "SdsId10 sdsId=\"11\"");
        }

        #[test]
        fn assignment_is_reproducible() {
            let (_dir, discovery) = fixture();
            let a = plan_duplication(&discovery);
            let b = plan_duplication(&discovery);
            let pairs_a: Vec<_> = a.remaps().map(|r| (r.old_id, r.new_id)).collect();
            let pairs_b: Vec<_> = b.remaps().map(|r| (r.old_id, r.new_id)).collect();
            assert_eq!(pairs_a, pairs_b);
        }

        #[test]
        fn remap_entries_carry_names() {
            let (_dir, discovery) = fixture();
            let plan = plan_duplication(&discovery);
            let names: Vec<_> = plan.remaps().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["Valve", "Pump"]);
        }
    }

    mod order_id {
        use super::*;

        #[test]
        fn one_above_the_project_maximum() {
            let (_dir, discovery) = fixture();
            let plan = plan_duplication(&discovery);
            assert_eq!(plan.new_order_id(), 7);
        }

        #[test]
        fn defaults_to_one_without_order_attributes() {
            let dir = TempDir::new().unwrap();
            let discovery = discover(dir.path(), None).unwrap();
            let plan = plan_duplication(&discovery);
            assert_eq!(plan.new_order_id(), 1);
        }
    }

    mod guid_replacements {
        use super::*;

        #[test]
        fn every_observed_guid_gets_a_fresh_valid_replacement() {
            let (_dir, discovery) = fixture();
            let plan = plan_duplication(&discovery);
            assert_eq!(plan.guid_count(), 2);
            let mut seen = HashSet::new();
            for guid in discovery.guids.guids() {
                let replacement = plan.replacement_guid(guid).unwrap();
                assert!(GUID_PATTERN.is_match(replacement));
                assert_eq!(replacement, replacement.to_ascii_lowercase());
                assert!(!replacement.eq_ignore_ascii_case(guid));
                assert!(seen.insert(replacement.to_string()), "replacement reused");
            }
        }

        #[test]
        fn unknown_guid_has_no_replacement() {
            let (_dir, discovery) = fixture();
            let plan = plan_duplication(&discovery);
            assert_eq!(plan.replacement_guid("00000000-0000-0000-0000-000000000000"), None);
        }
    }
}
