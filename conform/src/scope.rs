// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Scoped ownership of installed forwarding state.
//!
//! Every insert a test performs is recorded here, and when the scope is
//! rolled back — explicitly or on drop — everything is removed in reverse
//! insertion order.  Entries are always installed after the groups they
//! reference, so reverse order deletes dependents before dependencies.
//! Rollback is best-effort: a failed delete is logged and the rollback
//! continues, so one stuck object can't leak the rest.

use slog::{error, info};

use mat::{EntryRequest, GroupRequest, MatchData, PipelineOps};

use crate::HarnessResult;

enum Installed {
    Entry { table: String, key: MatchData },
    Group(u16),
}

pub struct ProgramScope<'a, P: PipelineOps> {
    pipeline: &'a P,
    log: slog::Logger,
    installed: Vec<Installed>,
    released: bool,
}

impl<'a, P: PipelineOps> ProgramScope<'a, P> {
    pub fn new(pipeline: &'a P, log: slog::Logger) -> Self {
        ProgramScope {
            pipeline,
            log,
            installed: Vec::new(),
            released: false,
        }
    }

    /// Install a table entry, to be removed when the scope closes.
    pub fn insert(&mut self, entry: EntryRequest) -> HarnessResult<()> {
        self.pipeline.entry_add(&entry)?;
        info!(self.log, "installed entry"; "entry" => %entry);
        self.installed.push(Installed::Entry {
            table: entry.table,
            key: entry.key,
        });
        Ok(())
    }

    /// Create an action-profile group, to be destroyed when the scope
    /// closes.  Insert a group before any entry that references it.
    pub fn insert_group(&mut self, group: GroupRequest) -> HarnessResult<()> {
        self.pipeline.group_add(&group)?;
        info!(self.log, "installed group"; "group" => %group);
        self.installed.push(Installed::Group(group.group_id));
        Ok(())
    }

    /// Number of objects this scope currently owns.
    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }

    /// Remove everything the scope installed, most recent first.
    pub fn rollback(&mut self) {
        while let Some(obj) = self.installed.pop() {
            let res = match &obj {
                Installed::Entry { table, key } => {
                    self.pipeline.entry_del(table, key)
                }
                Installed::Group(gid) => self.pipeline.group_del(*gid),
            };
            match (res, &obj) {
                (Ok(()), Installed::Entry { table, key }) => {
                    info!(self.log, "removed entry";
                        "table" => %table, "key" => %key);
                }
                (Ok(()), Installed::Group(gid)) => {
                    info!(self.log, "removed group"; "group_id" => *gid);
                }
                (Err(e), Installed::Entry { table, key }) => {
                    error!(self.log, "cleanup failed to remove entry";
                        "table" => %table, "key" => %key, "error" => %e);
                }
                (Err(e), Installed::Group(gid)) => {
                    error!(self.log, "cleanup failed to remove group";
                        "group_id" => *gid, "error" => %e);
                }
            }
        }
        self.released = true;
    }
}

impl<P: PipelineOps> Drop for ProgramScope<'_, P> {
    fn drop(&mut self) {
        if !self.released {
            self.rollback();
        }
    }
}
