//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then `use common::prelude::*;`.

use assert_fs::prelude::*;
use assert_fs::TempDir;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::sources;
    pub use super::SourceTree;
}

/// Java sources and patches used as fixtures.
#[allow(dead_code)]
pub mod sources {
    pub const BLOCK: &str = "package net.minecraft.server;

public class Block {
    private final int id;

    public Block(int id) {
        this.id = id;
    }
}
";

    /// Adds a getter to `Block.java`.
    pub const BLOCK_PATCH: &str = "--- a/net/minecraft/server/Block.java
+++ b/net/minecraft/server/Block.java
@@ -6,4 +6,8 @@
     public Block(int id) {
         this.id = id;
     }
+
+    public int getId() {
+        return this.id;
+    }
 }
";

    pub const ITEM: &str = "package net.minecraft.server;

public class Item {
    public static final int MAX_STACK = 64;
}
";

    /// Lowers the stack size; carries no prelude.
    pub const ITEM_PATCH: &str = "@@ -3,3 +3,3 @@
 public class Item {
-    public static final int MAX_STACK = 64;
+    public static final int MAX_STACK = 16;
 }
";
}

/// A temporary decompiled tree plus a patch directory.
#[allow(dead_code)]
pub struct SourceTree {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl SourceTree {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    /// Add a clean source file `net/minecraft/server/<class>.java`.
    pub fn with_source(self, class: &str, content: &str) -> Self {
        self.temp
            .child(format!("clean/net/minecraft/server/{}.java", class))
            .write_str(content)
            .unwrap();
        self
    }

    /// Add `<class>.patch` to the patch directory.
    pub fn with_patch(self, class: &str, content: &str) -> Self {
        self.temp
            .child(format!("patches/{}.patch", class))
            .write_str(content)
            .unwrap();
        self
    }

    pub fn clean_root(&self) -> std::path::PathBuf {
        self.temp.path().join("clean")
    }

    pub fn patch_dir(&self) -> std::path::PathBuf {
        let dir = self.temp.path().join("patches");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn out_root(&self) -> std::path::PathBuf {
        self.temp.path().join("out")
    }
}
