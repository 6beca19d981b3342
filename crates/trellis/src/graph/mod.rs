//! DAG construction and layout.
//!
//! - [`builder`]: commit records plus a branch summary into a [`CommitGraph`],
//!   applying the node cap
//! - [`layout`]: level and lane assignment
//! - [`dag`]: petgraph view of a node set used for reachability and cycle
//!   checks
//!
//! [`CommitGraph`]: crate::domain::CommitGraph

pub mod builder;
pub mod dag;
pub mod layout;

pub use builder::GraphBuilder;
pub use layout::{layout, LayoutSpacing};
