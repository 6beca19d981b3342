//! Trellis - a commit graph engine for repository history visualization.
//!
//! This crate turns a version-control log into a laid-out DAG and keeps it
//! cheap to serve across repeated requests:
//!
//! - [`parser`]: raw log text into commit records
//! - [`graph`]: DAG construction with a node cap, and the level/lane layout
//! - [`incremental`]: extending a cached graph with only the new commits
//! - [`cache`]: the memory + persistent cache tiers and the [`GraphEngine`]
//!   that chooses between them
//! - [`vcs`]: the version-control capability the engine consumes
//!
//! The crate also ships the `trellis` CLI binary.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod incremental;
pub mod parser;
pub mod vcs;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// Internal modules (not exposed as public API)
pub(crate) mod app;
pub(crate) mod output;

pub use cache::{GraphEngine, GraphSource, Resolved};
pub use domain::{BranchSummary, CommitGraph, CommitHash, CommitNode, RepoId};
pub use error::{Error, Result};
