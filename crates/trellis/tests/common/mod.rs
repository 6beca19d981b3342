//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use trellis::cache::ManualClock;
use trellis::config::EngineConfig;
use trellis::vcs::MemoryVcs;
use trellis::{GraphEngine, RepoId};
use trellis_store::MemoryStore;

/// A full-length hex object name for commit number `n`.
pub fn hash(n: usize) -> String {
    format!("{n:040x}")
}

/// `count` commits on `main`, one second apart, with `main` checked out.
pub fn linear_history(count: usize) -> MemoryVcs {
    let vcs = MemoryVcs::new();
    for n in 1..=count {
        vcs.advance("main", &hash(n), i64::try_from(n).unwrap() * 10);
    }
    vcs.checkout("main");
    vcs
}

/// An engine over an in-memory store and a hand-driven clock.
pub struct Harness {
    pub engine: GraphEngine,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub vcs: Arc<MemoryVcs>,
    pub repo: RepoId,
}

impl Harness {
    pub async fn new(vcs: MemoryVcs, config: EngineConfig) -> Self {
        Self::with_store(vcs, config, Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(vcs: MemoryVcs, config: EngineConfig, store: Arc<MemoryStore>) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let engine = GraphEngine::with_clock(config, store.clone(), clock.clone());
        let vcs = Arc::new(vcs);
        let repo = RepoId::from("repo");
        engine.register(repo.clone(), vcs.clone()).await;
        Self {
            engine,
            store,
            clock,
            vcs,
            repo,
        }
    }

    /// Move the clock past the memory tier's TTL.
    pub fn expire_memory(&self) {
        let ttl = self.engine.config().memory_ttl();
        self.clock.advance(ttl + chrono::TimeDelta::seconds(1));
    }
}

/// Returns `true` if a `git` executable is on the PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A git repository with `commits` commits on `main`.
pub fn git_repo(dir: &Path, commits: usize) {
    git(dir, &["init", "-q", "-b", "main"]);
    git(dir, &["config", "user.email", "dev@example.com"]);
    git(dir, &["config", "user.name", "Dev"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    for n in 1..=commits {
        git(
            dir,
            &["commit", "-q", "--allow-empty", "-m", &format!("commit {n}")],
        );
    }
}

/// Run the trellis binary in `dir`.
pub fn run_trellis_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute trellis binary")
}
