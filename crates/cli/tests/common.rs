// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// A scratch state directory plus a config file pointing at a closed port.
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            "[remote]\nurl = \"ws://127.0.0.1:1\"\nconnect_timeout_secs = 1\n",
        )
        .unwrap();
        Workspace { temp }
    }

    /// `till` isolated to this workspace.
    pub fn till(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("till");
        cmd.env("TILL_CONFIG", self.temp.path().join("config.toml"))
            .env("TILL_STATE_DIR", self.temp.path().join("state"))
            .env_remove("RUST_LOG");
        cmd
    }

    /// Enqueues and returns the new operation id.
    pub fn enqueue(&self, args: &[&str]) -> String {
        let output = self.till().arg("enqueue").args(args).output().unwrap();
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn stdout(&self, args: &[&str]) -> String {
        let output = self.till().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }
}
