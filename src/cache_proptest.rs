//! Property-based tests for cache keys and the patch engine.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::cache::{compute_key, KEY_LENGTH};
    use crate::patch::{apply, parse};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    // ============================================================================
    // compute_key property tests
    // ============================================================================

    proptest! {
        /// Property: the key does not depend on identity order
        #[test]
        fn compute_key_is_order_independent(mut identities in prop::collection::vec("[0-9a-f]{40}", 0..6)) {
            let forward = compute_key(&identities);
            identities.reverse();
            prop_assert_eq!(forward, compute_key(&identities));
        }

        /// Property: keys are always the last KEY_LENGTH hex characters
        #[test]
        fn compute_key_has_fixed_length(identities in prop::collection::vec(".*", 0..4)) {
            let key = compute_key(&identities);
            prop_assert_eq!(key.as_str().len(), KEY_LENGTH);
            prop_assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    // ============================================================================
    // patch property tests
    // ============================================================================

    #[derive(Debug, Clone)]
    enum Edit {
        Delete,
        Insert(String),
        Replace(String),
    }

    /// A base file plus edits keyed by the base line they touch.
    fn edited_file() -> impl Strategy<Value = (Vec<String>, BTreeMap<usize, Edit>)> {
        prop::collection::vec("[a-z]{0,10}", 1..40).prop_flat_map(|base| {
            let len = base.len();
            let edit = prop_oneof![
                Just(Edit::Delete),
                "[A-Z]{1,8}".prop_map(Edit::Insert),
                "[A-Z]{1,8}".prop_map(Edit::Replace),
            ];
            (Just(base), prop::collection::btree_map(0..len, edit, 1..6))
        })
    }

    /// Render `edits` as a unified diff, one hunk per edit with a trailing
    /// context line where the next edit leaves room. Returns the diff and
    /// the target it describes.
    fn diff_of(base: &[String], edits: &BTreeMap<usize, Edit>) -> (String, Vec<String>) {
        let mut text = String::from("--- a/Generated.java\n+++ b/Generated.java\n");
        let mut target: Vec<String> = Vec::new();
        let mut cursor = 0;
        let positions: Vec<usize> = edits.keys().copied().collect();

        for (n, (&at, edit)) in edits.iter().enumerate() {
            let next = positions.get(n + 1).copied().unwrap_or(base.len());
            target.extend(base[cursor..at].iter().cloned());
            let new_start = target.len() + 1;

            let mut body = Vec::new();
            let (mut old_start, mut old_len, mut new_len) = (at + 1, 0, 0);
            match edit {
                Edit::Delete => {
                    body.push(format!("-{}", base[at]));
                    old_len += 1;
                    cursor = at + 1;
                }
                Edit::Replace(line) => {
                    body.push(format!("-{}", base[at]));
                    body.push(format!("+{}", line));
                    target.push(line.clone());
                    old_len += 1;
                    new_len += 1;
                    cursor = at + 1;
                }
                Edit::Insert(line) => {
                    body.push(format!("+{}", line));
                    target.push(line.clone());
                    new_len += 1;
                    old_start = at;
                    cursor = at;
                }
            }
            if cursor < next {
                if old_len == 0 {
                    // An insertion is now anchored on its context line.
                    old_start = cursor + 1;
                }
                body.push(format!(" {}", base[cursor]));
                target.push(base[cursor].clone());
                old_len += 1;
                new_len += 1;
                cursor += 1;
            }

            text.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                old_start, old_len, new_start, new_len
            ));
            for line in body {
                text.push_str(&line);
                text.push('\n');
            }
        }

        target.extend(base[cursor..].iter().cloned());
        (text, target)
    }

    proptest! {
        /// Property: replacing one line of a file with a generated hunk
        /// reproduces the target
        #[test]
        fn single_line_replacement_round_trips(
            base in prop::collection::vec("[a-z ]{0,12}", 1..20),
            index in any::<prop::sample::Index>(),
            replacement in "[A-Z]{1,12}",
        ) {
            let at = index.index(base.len());
            let mut expected = base.clone();
            expected[at] = replacement.clone();

            let text = format!(
                "@@ -{line},1 +{line},1 @@\n-{old}\n+{new}\n",
                line = at + 1,
                old = base[at],
                new = replacement
            );
            let patch = parse("Generated.patch", &text).unwrap();
            prop_assert_eq!(apply(base.as_slice(), &patch).unwrap(), expected);
        }

        /// Property: a patch with a prelude applies exactly like one without
        #[test]
        fn prelude_is_optional(base in prop::collection::vec("[a-z]{1,8}", 2..10)) {
            let hunk = format!("@@ -1,1 +1,2 @@\n {}\n+inserted\n", base[0]);
            let with_prelude = format!("--- a/Foo.java\n+++ b/Foo.java\n{}", hunk);

            let bare = apply(base.as_slice(), &parse("Foo.patch", &hunk).unwrap()).unwrap();
            let full = apply(base.as_slice(), &parse("Foo.patch", &with_prelude).unwrap()).unwrap();
            prop_assert_eq!(bare, full);
        }

        /// Property: a multi-hunk diff mixing insertions, deletions and
        /// replacements turns the base into the target it was made from
        #[test]
        fn multi_hunk_diff_reproduces_target((base, edits) in edited_file()) {
            let (text, target) = diff_of(&base, &edits);
            let patch = parse("Generated.patch", &text).unwrap();
            prop_assert_eq!(patch.hunks.len(), edits.len());
            prop_assert_eq!(apply(base.as_slice(), &patch).unwrap(), target);
        }
    }
}
