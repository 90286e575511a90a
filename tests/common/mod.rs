//! # Shared Fixtures for islcheck Integration Tests
//!
//! Builds throwaway ISL-shaped source trees and fake tool executables
//! (`/bin/sh` scripts) inside temporary directories.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use islcheck::config::HarnessConfig;
use islcheck::kinds::{Selection, ToolKind};
use tempfile::TempDir;

/// A temporary source tree with `test_inputs/` plus a bin and output dir.
pub struct Corpus {
    pub root: TempDir,
}

impl Corpus {
    /// Creates `test_inputs/` and every subdirectory the globbed kinds read.
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        for sub in [
            "src/test_inputs/codegen/cloog",
            "src/test_inputs/codegen/omega",
            "src/test_inputs/codegen/pldi2012",
            "src/test_inputs/flow",
            "src/test_inputs/schedule",
            "bin",
            "out",
        ] {
            fs::create_dir_all(root.path().join(sub)).unwrap();
        }
        Self { root }
    }

    pub fn srcdir(&self) -> PathBuf {
        self.root.path().join("src")
    }

    pub fn inputs(&self) -> PathBuf {
        self.srcdir().join("test_inputs")
    }

    pub fn bin(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn out(&self) -> PathBuf {
        self.root.path().join("out")
    }

    /// Writes `content` at `rel` beneath `test_inputs/`.
    pub fn input(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.inputs().join(rel);
        fs::write(&path, content).unwrap();
        path
    }

    /// Writes every fixture a listed kind requires, with the same content.
    pub fn listed_inputs(&self, kind: ToolKind, content: &str) -> Vec<&'static str> {
        let Selection::Listed(names) = kind.spec().selection else {
            panic!("{kind} does not use a fixture list");
        };
        for name in names {
            self.input(name, content);
        }
        names.to_vec()
    }

    /// Installs an executable shell script named `name` in `bin/`.
    pub fn tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A comparator that succeeds iff both files are byte-identical.
    pub fn diff_comparator(&self, name: &str) -> PathBuf {
        self.tool(name, "diff \"$1\" \"$2\"")
    }

    /// Config with the default differ and `out/` as output directory.
    pub fn config(&self) -> HarnessConfig {
        HarnessConfig::new(self.srcdir())
            .unwrap()
            .with_output_dir(self.out())
    }

    /// Names of `test-*` files left in `dir`.
    pub fn leftovers(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("test-"))
            .collect();
        names.sort();
        names
    }
}
