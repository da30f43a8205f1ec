//! Integration tests for applying a patch directory to a decompiled tree.

mod common;
use common::prelude::*;

use buildtools::error::Error;
use buildtools::patch::PatchSet;
use std::path::PathBuf;

#[test]
fn test_applies_every_patch_in_name_order() {
    let tree = SourceTree::new()
        .with_source("Block", sources::BLOCK)
        .with_source("Item", sources::ITEM)
        .with_patch("Item", sources::ITEM_PATCH)
        .with_patch("Block", sources::BLOCK_PATCH);

    let set = PatchSet::load(&tree.patch_dir()).unwrap();
    assert_eq!(set.len(), 2);

    let written = set.apply_all(&tree.clean_root(), &tree.out_root()).unwrap();
    assert_eq!(
        written,
        vec![
            PathBuf::from("net/minecraft/server/Block.java"),
            PathBuf::from("net/minecraft/server/Item.java"),
        ]
    );

    tree.temp
        .child("out/net/minecraft/server/Block.java")
        .assert(predicate::str::contains("public int getId()"));
    tree.temp
        .child("out/net/minecraft/server/Item.java")
        .assert(predicate::str::contains("MAX_STACK = 16"));
}

#[test]
fn test_clean_tree_is_left_untouched() {
    let tree = SourceTree::new()
        .with_source("Item", sources::ITEM)
        .with_patch("Item", sources::ITEM_PATCH);

    PatchSet::load(&tree.patch_dir())
        .unwrap()
        .apply_all(&tree.clean_root(), &tree.out_root())
        .unwrap();

    tree.temp
        .child("clean/net/minecraft/server/Item.java")
        .assert(sources::ITEM);
}

#[test]
fn test_non_patch_files_are_ignored() {
    let tree = SourceTree::new()
        .with_source("Item", sources::ITEM)
        .with_patch("Item", sources::ITEM_PATCH);
    tree.temp.child("patches/README.txt").write_str("notes").unwrap();

    let set = PatchSet::load(&tree.patch_dir()).unwrap();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_empty_patch_directory() {
    let tree = SourceTree::new();
    let set = PatchSet::load(&tree.patch_dir()).unwrap();
    assert!(set.is_empty());
    assert!(set
        .apply_all(&tree.clean_root(), &tree.out_root())
        .unwrap()
        .is_empty());
}

#[test]
fn test_missing_base_file_fails() {
    let tree = SourceTree::new().with_patch("Item", sources::ITEM_PATCH);

    let error = PatchSet::load(&tree.patch_dir())
        .unwrap()
        .apply_all(&tree.clean_root(), &tree.out_root())
        .unwrap_err();
    assert!(matches!(error, Error::PatchApplication { .. }));
}

#[test]
fn test_mismatched_context_names_the_patch() {
    let tree = SourceTree::new()
        .with_source("Item", &sources::ITEM.replace("64", "32"))
        .with_patch("Item", sources::ITEM_PATCH);

    let error = PatchSet::load(&tree.patch_dir())
        .unwrap()
        .apply_all(&tree.clean_root(), &tree.out_root())
        .unwrap_err();
    match error {
        Error::PatchApplication { patch, hunk, .. } => {
            assert_eq!(patch, "Item.patch");
            assert_eq!(hunk, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_malformed_patch_fails_to_load() {
    let tree = SourceTree::new().with_patch("Broken", "@@ -1,2 +1,2 @@\n context\n");

    let error = PatchSet::load(&tree.patch_dir()).unwrap_err();
    assert!(matches!(error, Error::PatchParse { .. }));
}
