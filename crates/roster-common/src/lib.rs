//! # roster-common
//!
//! Container record types, error definitions, configuration models, and
//! constants shared by the roster workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate. Records defined here are plain data snapshots; all
//! indexing and query behaviour lives in `roster-view`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
