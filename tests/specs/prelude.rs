//! Test helpers shared across the workspace-level specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolve the path to a workspace binary built alongside this test binary.
///
/// The root package has no `[[bin]]` of its own, so Cargo never sets
/// `CARGO_BIN_EXE_<name>` for it; resolve relative to the shared `target/`
/// directory instead, the way the integration binary is found from the
/// test binary's own path (`target/debug/deps/specs-<hash>`).
pub fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn yggd_cmd(args: &[&str]) -> Command {
    let mut cmd = Command::new(binary_path("yggd"));
    cmd.args(args);
    cmd
}

pub trait RunExt {
    fn run(self) -> Run;
}

impl RunExt for Command {
    fn run(mut self) -> Run {
        Run { output: self.output().expect("command should run") }
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn passes(self) -> Self {
        assert!(
            self.output.status.success(),
            "expected exit 0, got {:?}\nstderr: {}",
            self.output.status.code(),
            self.stderr()
        );
        self
    }

    pub fn fails_with(self, code: i32) -> Self {
        assert_eq!(self.output.status.code(), Some(code));
        self
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "expected stdout to contain {needle:?}, got: {}", self.stdout());
        self
    }
}
