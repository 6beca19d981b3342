//! Commit log parsing.
//!
//! The engine asks the version-control tool for one record per commit, with
//! fields separated by the unit separator (`0x1f`):
//!
//! ```text
//! <hash> 0x1f <parent hashes, space separated> 0x1f <ref decorations, comma separated> 0x1f <unix timestamp>
//! ```
//!
//! Parsing never fails. Lines that cannot be used are skipped and reported as
//! [`ParseWarning`]s so the caller can log them.

use crate::domain::{CommitHash, CommitNode};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Pretty-format string producing the record layout described above.
pub const LOG_FORMAT: &str = "%H%x1f%P%x1f%D%x1f%ct";

/// Separator between fields of one record.
pub const FIELD_SEPARATOR: char = '\x1f';

/// Decoration prefix identifying a local branch.
pub const LOCAL_BRANCH_PREFIX: &str = "refs/heads/";

/// Decoration prefix marking the checked-out branch (`HEAD -> refs/heads/x`).
const HEAD_POINTER_PREFIX: &str = "HEAD -> ";

/// Number of fields in a record.
const FIELD_COUNT: usize = 4;

/// Result of parsing a log: the commits keyed by hash plus any skipped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    /// Parsed commits, with `level`/`lane` left at zero
    pub commits: BTreeMap<CommitHash, CommitNode>,

    /// Problems found while parsing, in line order
    pub warnings: Vec<ParseWarning>,
}

/// A non-fatal problem with one line of log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// The line had fewer than four fields.
    MissingFields {
        /// 1-based line number
        line_number: usize,
    },

    /// The commit or a parent hash is not a hex object name.
    InvalidHash {
        /// 1-based line number
        line_number: usize,
        /// The offending value
        value: String,
    },

    /// The timestamp field is not an integer.
    InvalidTimestamp {
        /// 1-based line number
        line_number: usize,
        /// The offending value
        value: String,
    },

    /// A hash appeared again with different parents; the later record won.
    DuplicateCommit {
        /// 1-based line number of the later record
        line_number: usize,
        /// The repeated hash
        hash: CommitHash,
    },
}

impl ParseWarning {
    /// Line the warning refers to.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MissingFields { line_number }
            | Self::InvalidHash { line_number, .. }
            | Self::InvalidTimestamp { line_number, .. }
            | Self::DuplicateCommit { line_number, .. } => *line_number,
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields { line_number } => {
                write!(f, "line {line_number}: expected {FIELD_COUNT} fields")
            }
            Self::InvalidHash { line_number, value } => {
                write!(f, "line {line_number}: invalid hash '{value}'")
            }
            Self::InvalidTimestamp { line_number, value } => {
                write!(f, "line {line_number}: invalid timestamp '{value}'")
            }
            Self::DuplicateCommit { line_number, hash } => {
                write!(f, "line {line_number}: duplicate commit {hash}")
            }
        }
    }
}

/// Parse raw log output into commit records.
///
/// Empty input (or input made only of blank lines) yields an empty map. When
/// a hash appears more than once the last record wins.
#[must_use]
pub fn parse_log(raw: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for (index, line) in raw.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match parse_record(line, line_number) {
            Ok(node) => {
                if let Some(previous) = parsed.commits.get(&node.hash) {
                    if previous.parents != node.parents {
                        parsed.warnings.push(ParseWarning::DuplicateCommit {
                            line_number,
                            hash: node.hash.clone(),
                        });
                    }
                }
                parsed.commits.insert(node.hash.clone(), node);
            }
            Err(warning) => parsed.warnings.push(warning),
        }
    }

    parsed
}

fn parse_record(line: &str, line_number: usize) -> Result<CommitNode, ParseWarning> {
    let fields: Vec<&str> = line.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();
    let [hash, parents, decorations, timestamp] = fields[..] else {
        return Err(ParseWarning::MissingFields { line_number });
    };

    let hash = hash.trim();
    if !is_object_name(hash) {
        return Err(ParseWarning::InvalidHash {
            line_number,
            value: hash.to_string(),
        });
    }

    let mut parent_hashes = Vec::new();
    for parent in parents.split_whitespace() {
        if !is_object_name(parent) {
            return Err(ParseWarning::InvalidHash {
                line_number,
                value: parent.to_string(),
            });
        }
        parent_hashes.push(CommitHash::from(parent));
    }

    let timestamp = timestamp.trim();
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|_| ParseWarning::InvalidTimestamp {
            line_number,
            value: timestamp.to_string(),
        })?;

    let mut node = CommitNode::new(hash, parent_hashes, timestamp);
    node.branches = local_branch_names(decorations);
    Ok(node)
}

/// Extract local branch names from a comma-separated decoration list.
///
/// Only full `refs/heads/` refs count. Tags, remote-tracking refs and a
/// bare `HEAD` are ignored; the `HEAD -> ` marker is stripped first.
#[must_use]
pub fn local_branch_names(decorations: &str) -> BTreeSet<String> {
    decorations
        .split(',')
        .map(str::trim)
        .map(|decoration| {
            decoration
                .strip_prefix(HEAD_POINTER_PREFIX)
                .unwrap_or(decoration)
        })
        .filter_map(|decoration| decoration.strip_prefix(LOCAL_BRANCH_PREFIX))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_object_name(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}
