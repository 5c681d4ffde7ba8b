// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Table state shared by the software backends.  All validation against the
//! pipeline profile happens here, so every backend enforces the same
//! programming contract.

use std::collections::BTreeMap;

use mat::{
    EntryAction, EntryRequest, GroupRequest, MatError, MatResult, MatchData,
};

use crate::profile;

#[derive(Debug, Clone)]
pub(crate) struct TableSlot {
    pub key: MatchData,
    pub action: EntryAction,
}

/// The installed state of a pipeline: per-table entry lists plus the
/// action-profile groups.
pub(crate) struct TableStore {
    pub tables: BTreeMap<&'static str, Vec<TableSlot>>,
    pub groups: BTreeMap<u16, GroupRequest>,
}

impl TableStore {
    pub fn new() -> TableStore {
        TableStore {
            tables: profile::TABLES
                .iter()
                .map(|t| (t.name, Vec::new()))
                .collect(),
            groups: BTreeMap::new(),
        }
    }

    fn table_mut(&mut self, name: &str) -> MatResult<&mut Vec<TableSlot>> {
        profile::table(name)
            .ok_or_else(|| MatError::NoSuchTable(name.to_string()))?;
        Ok(self.tables.get_mut(name).unwrap())
    }

    pub fn table(&self, name: &str) -> MatResult<&Vec<TableSlot>> {
        profile::table(name)
            .ok_or_else(|| MatError::NoSuchTable(name.to_string()))?;
        Ok(self.tables.get(name).unwrap())
    }

    pub fn entry_add(&mut self, entry: &EntryRequest) -> MatResult<()> {
        profile::validate_entry(entry)?;
        if let EntryAction::Group(gid) = entry.action {
            if !self.groups.contains_key(&gid) {
                return Err(MatError::NoSuchGroup(gid));
            }
        }

        let size = profile::table(&entry.table).unwrap().size;
        let slots = self.table_mut(&entry.table)?;
        if let Some(slot) = slots.iter().find(|s| s.key == entry.key) {
            // inserting the identical entry again is a no-op
            return if slot.action == entry.action {
                Ok(())
            } else {
                Err(MatError::Exists(format!(
                    "{} already maps {} to {}",
                    entry.table, entry.key, slot.action
                )))
            };
        }
        if slots.len() == size {
            return Err(MatError::TableFull(entry.table.clone()));
        }
        slots.push(TableSlot {
            key: entry.key.clone(),
            action: entry.action.clone(),
        });
        Ok(())
    }

    pub fn entry_del(
        &mut self,
        table: &str,
        key: &MatchData,
    ) -> MatResult<()> {
        let slots = self.table_mut(table)?;
        match slots.iter().position(|s| &s.key == key) {
            Some(idx) => {
                slots.remove(idx);
                Ok(())
            }
            None => Err(MatError::Missing(format!("{table} has no [{key}]"))),
        }
    }

    pub fn group_add(&mut self, group: &GroupRequest) -> MatResult<()> {
        profile::validate_group(group)?;
        if let Some(existing) = self.groups.get(&group.group_id) {
            return if existing == group {
                Ok(())
            } else {
                Err(MatError::Exists(format!(
                    "group {} already exists with different members",
                    group.group_id
                )))
            };
        }
        self.groups.insert(group.group_id, group.clone());
        Ok(())
    }

    pub fn group_del(&mut self, group_id: u16) -> MatResult<()> {
        if !self.groups.contains_key(&group_id) {
            return Err(MatError::Missing(format!("no group {group_id}")));
        }
        let referenced = self.tables.values().flatten().any(
            |s| matches!(s.action, EntryAction::Group(gid) if gid == group_id),
        );
        if referenced {
            return Err(MatError::Busy(format!(
                "group {group_id} is still referenced by a table entry"
            )));
        }
        self.groups.remove(&group_id);
        Ok(())
    }

    pub fn table_clear(&mut self, table: &str) -> MatResult<()> {
        self.table_mut(table)?.clear();
        Ok(())
    }

    pub fn table_occupancy(&self, table: &str) -> MatResult<usize> {
        Ok(self.table(table)?.len())
    }

    pub fn reset_all(&mut self) {
        for slots in self.tables.values_mut() {
            slots.clear();
        }
        self.groups.clear();
    }
}
