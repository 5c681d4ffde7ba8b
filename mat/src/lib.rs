// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The match-action abstraction used to program a forwarding pipeline.
//!
//! Tests describe forwarding state with high-level types (MAC addresses,
//! IPv6 prefixes, port numbers).  Before that state reaches a pipeline
//! backend it is marshalled into the intermediate representation defined
//! here: a table name, a list of named match fields (each one exact,
//! ternary, or longest-prefix), and either a direct action with named
//! arguments or a reference to an action-profile group.  Backends consume
//! the intermediate representation and never see the high-level types, so
//! new tables and scenarios can be added without touching backend code.

use thiserror::Error;

mod entry;
mod ir;

pub use entry::*;
pub use ir::*;

/// A specialized Result type for pipeline programming operations
pub type MatResult<T> = Result<T, MatError>;

/// Error type conveying additional information about programming errors
#[derive(Error, Debug)]
pub enum MatError {
    /// The named table does not exist in the pipeline being programmed.
    #[error("no such table: {}", .0)]
    NoSuchTable(String),
    /// The named action is not valid for the table it was applied to.
    #[error("table {table} has no action {action}")]
    NoSuchAction { table: String, action: String },
    /// A table entry references an action-profile group that has not been
    /// created.
    #[error("no such group: {}", .0)]
    NoSuchGroup(u16),
    /// A match field doesn't fit the table's key: wrong name, wrong match
    /// kind, or a value too wide for the field.
    #[error("bad match: {}", .0)]
    BadMatch(String),
    /// An argument passed to the abstraction layer is invalid or
    /// inappropriate.  This indicates misbehavior from the caller.
    #[error("invalid argument: {}", .0)]
    InvalidArg(String),
    /// The caller is trying to create something that already exists with
    /// different contents.
    #[error("already exists: {}", .0)]
    Exists(String),
    /// The caller is trying to remove something that is not present.
    #[error("missing: {}", .0)]
    Missing(String),
    /// The object cannot be removed while something else references it.
    #[error("resource is busy: {}", .0)]
    Busy(String),
    /// The table has no room for another entry.
    #[error("table {} is full", .0)]
    TableFull(String),
    /// The abstraction layer detected some internal inconsistency.
    #[error("internal error: {}", .0)]
    Internal(String),
}

/// The operations a programmable pipeline must provide to have forwarding
/// state written into it.  Implementations validate each request against
/// their pipeline profile and fail with a `MatError` when the request names
/// a table, action, or match kind the pipeline doesn't have.
///
/// `entry_add` and `group_add` are idempotent: re-inserting an identical
/// entry or group succeeds, while inserting a different value under an
/// existing key fails with `MatError::Exists`.
pub trait PipelineOps {
    /// Install a table entry.
    fn entry_add(&self, entry: &EntryRequest) -> MatResult<()>;

    /// Remove the table entry with the given key.
    fn entry_del(&self, table: &str, key: &MatchData) -> MatResult<()>;

    /// Create an action-profile group.
    fn group_add(&self, group: &GroupRequest) -> MatResult<()>;

    /// Destroy an action-profile group.  Fails with `MatError::Busy` while
    /// any table entry still references the group.
    fn group_del(&self, group_id: u16) -> MatResult<()>;

    /// Remove every entry from the named table.
    fn table_clear(&self, table: &str) -> MatResult<()>;

    /// Number of entries currently installed in the named table.
    fn table_occupancy(&self, table: &str) -> MatResult<usize>;

    /// Number of action-profile groups currently installed.
    fn group_count(&self) -> usize;

    /// Remove all installed state: every table entry and every group.
    fn reset_all(&self) -> MatResult<()>;
}
