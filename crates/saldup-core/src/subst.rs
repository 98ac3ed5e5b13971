//! Literal find/replace rule sets for line rewriting.
//!
//! The planner compiles the definition-ID remapping into an ordered list of
//! `{seek, replace}` pairs; the rewrite engine runs every line through the
//! set. Application is a single left-to-right pass over the input:
//!
//! - at each position the earliest-matching rule wins
//! - when two rules match at the same position, the longer seek wins, so
//!   `SdsId12` is never half-eaten by a rule for `SdsId1`
//! - replacement text is never rescanned, so one rule's output can never be
//!   picked up as another rule's seek
//!
//! A sequential replace-one-rule-at-a-time cascade has a double-remap hazard
//! with numeric tokens (the output of `5 -> 12` feeds a later `12 -> 19`
//! rule). The single pass gives the same answer in the benign cases and a
//! well-defined one in the pathological ones.

// ============================================================================
// Substitution Rules
// ============================================================================

/// One literal find/replace pair. No pattern syntax; `seek` matches as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub seek: String,
    pub replace: String,
}

impl Substitution {
    /// Create a new rule.
    pub fn new(seek: impl Into<String>, replace: impl Into<String>) -> Self {
        Substitution {
            seek: seek.into(),
            replace: replace.into(),
        }
    }
}

/// An ordered collection of substitution rules applied in one pass.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionSet {
    rules: Vec<Substitution>,
}

impl SubstitutionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        SubstitutionSet::default()
    }

    /// Add a rule. Rules with an empty seek are ignored during application.
    pub fn push(&mut self, seek: impl Into<String>, replace: impl Into<String>) {
        self.rules.push(Substitution::new(seek, replace));
    }

    /// Number of rules in the set.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rules in insertion order.
    pub fn rules(&self) -> &[Substitution] {
        &self.rules
    }

    /// Apply the whole set to `input` in a single left-to-right pass.
    pub fn apply(&self, input: &str) -> String {
        if self.rules.is_empty() {
            return input.to_string();
        }
        let mut output = String::with_capacity(input.len());
        let mut rest = input;
        while !rest.is_empty() {
            match self.first_match(rest) {
                Some((offset, rule)) => {
                    output.push_str(&rest[..offset]);
                    output.push_str(&rule.replace);
                    rest = &rest[offset + rule.seek.len()..];
                }
                None => {
                    output.push_str(rest);
                    break;
                }
            }
        }
        output
    }

    /// Find the earliest match of any rule in `text`.
    ///
    /// Ties on position go to the rule with the longest seek.
    fn first_match(&self, text: &str) -> Option<(usize, &Substitution)> {
        let mut best: Option<(usize, &Substitution)> = None;
        for rule in &self.rules {
            if rule.seek.is_empty() {
                continue;
            }
            let Some(offset) = text.find(&rule.seek) else {
                continue;
            };
            best = match best {
                Some((best_offset, best_rule))
                    if best_offset < offset
                        || (best_offset == offset
                            && best_rule.seek.len() >= rule.seek.len()) =>
                {
                    Some((best_offset, best_rule))
                }
                _ => Some((offset, rule)),
            };
        }
        best
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod single_rule {
        use super::*;

        #[test]
        fn replaces_one_occurrence() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId5", "SdsId10");
            assert_eq!(set.apply("value = SdsId5;"), "value = SdsId10;");
        }

        #[test]
        fn replaces_every_occurrence_on_a_line() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId5", "SdsId10");
            assert_eq!(set.apply("SdsId5 + SdsId5 + SdsId5"), "SdsId10 + SdsId10 + SdsId10");
        }

        #[test]
        fn quoted_attribute_form() {
            let mut set = SubstitutionSet::new();
            set.push(r#"sdsId="5""#, r#"sdsId="10""#);
            assert_eq!(
                set.apply(r#"<Signal sdsId="5" unit="bar"/>"#),
                r#"<Signal sdsId="10" unit="bar"/>"#
            );
        }

        #[test]
        fn no_match_leaves_input_unchanged() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId5", "SdsId10");
            assert_eq!(set.apply("nothing to see"), "nothing to see");
        }
    }

    mod rule_interaction {
        use super::*;

        #[test]
        fn longest_seek_wins_at_same_position() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId1", "SdsId20");
            set.push("SdsId12", "SdsId21");
            assert_eq!(set.apply("SdsId12"), "SdsId21");
        }

        #[test]
        fn longest_seek_wins_regardless_of_insertion_order() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId12", "SdsId21");
            set.push("SdsId1", "SdsId20");
            assert_eq!(set.apply("SdsId12"), "SdsId21");
        }

        #[test]
        fn earliest_match_wins_across_rules() {
            let mut set = SubstitutionSet::new();
            set.push("bbb", "YYY");
            set.push("aaa", "XXX");
            assert_eq!(set.apply("aaa bbb"), "XXX YYY");
        }

        #[test]
        fn replacement_text_is_never_rescanned() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId1", "SdsId12");
            set.push("SdsId12", "SdsId99");
            // The SdsId12 produced by the first rule must survive.
            assert_eq!(set.apply("SdsId1 and SdsId12"), "SdsId12 and SdsId99");
        }

        #[test]
        fn shorter_rule_still_applies_elsewhere() {
            let mut set = SubstitutionSet::new();
            set.push("SdsId1", "SdsId20");
            set.push("SdsId12", "SdsId21");
            assert_eq!(set.apply("SdsId1 SdsId12 SdsId1"), "SdsId20 SdsId21 SdsId20");
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn empty_set_is_identity() {
            let set = SubstitutionSet::new();
            assert!(set.is_empty());
            assert_eq!(set.apply("SdsId5"), "SdsId5");
        }

        #[test]
        fn empty_input() {
            let mut set = SubstitutionSet::new();
            set.push("a", "b");
            assert_eq!(set.apply(""), "");
        }

        #[test]
        fn empty_seek_is_ignored() {
            let mut set = SubstitutionSet::new();
            set.push("", "boom");
            set.push("x", "y");
            assert_eq!(set.apply("axa"), "aya");
        }

        #[test]
        fn adjacent_matches() {
            let mut set = SubstitutionSet::new();
            set.push("ab", "c");
            assert_eq!(set.apply("abab"), "cc");
        }

        #[test]
        fn len_counts_rules() {
            let mut set = SubstitutionSet::new();
            set.push("a", "b");
            set.push("c", "d");
            assert_eq!(set.len(), 2);
            assert_eq!(set.rules()[0], Substitution::new("a", "b"));
        }
    }
}
