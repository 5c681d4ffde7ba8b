// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Validated requests for the two kinds of state a pipeline holds: table
//! entries and action-profile groups.
//!
//! Match fields can only be built through the kind-specific constructors
//! on `MatchEntryField`, and a request can only be built through its
//! builder, so a malformed specification (duplicate field, empty key, a
//! ternary value wider than its mask, both an action and a group) fails
//! here rather than at submission time.

use std::fmt;

use oxnet::Ipv6Net;

use crate::ir::*;
use crate::MatError;
use crate::MatResult;

impl MatchEntryField {
    /// An exact-match field.
    pub fn exact(
        name: impl Into<String>,
        value: impl Into<ValueTypes>,
    ) -> MatchEntryField {
        MatchEntryField {
            name: name.into(),
            value: MatchEntryValue::Value(value.into()),
        }
    }

    /// A ternary field: only the bits set in `mask` are compared.  The
    /// value must not have bits outside the mask.
    pub fn ternary(
        name: impl Into<String>,
        val: u64,
        mask: u64,
    ) -> MatResult<MatchEntryField> {
        if val & !mask != 0 {
            return Err(MatError::BadMatch(format!(
                "ternary value {val:#x} has bits outside mask {mask:#x}"
            )));
        }
        Ok(MatchEntryField {
            name: name.into(),
            value: MatchEntryValue::Mask(MatchMask { val, mask }),
        })
    }

    /// A longest-prefix-match field over an IPv6 prefix.  The prefix
    /// length is bounded by the address width by construction.
    pub fn lpm(name: impl Into<String>, net: Ipv6Net) -> MatchEntryField {
        MatchEntryField {
            name: name.into(),
            value: MatchEntryValue::Lpm(net.into()),
        }
    }
}

/// What a matching packet has done to it: either a direct action or a
/// selection from an action-profile group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    Direct(ActionData),
    Group(u16),
}

impl fmt::Display for EntryAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntryAction::Direct(a) => write!(f, "{a}"),
            EntryAction::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// A fully validated request to install one table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub table: String,
    pub key: MatchData,
    pub action: EntryAction,
}

impl EntryRequest {
    /// Begin building an entry for the named table.
    pub fn table(name: impl Into<String>) -> EntryBuilder {
        EntryBuilder {
            table: name.into(),
            fields: Vec::new(),
            action: None,
            group: None,
            defect: None,
        }
    }
}

impl fmt::Display for EntryRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}] -> {}", self.table, self.key, self.action)
    }
}

pub struct EntryBuilder {
    table: String,
    fields: Vec<MatchEntryField>,
    action: Option<ActionData>,
    group: Option<u16>,
    defect: Option<MatError>,
}

impl EntryBuilder {
    fn push_field(mut self, field: MatchEntryField) -> Self {
        if self.fields.iter().any(|f| f.name == field.name) {
            self.defect = Some(MatError::BadMatch(format!(
                "duplicate match field: {}",
                field.name
            )));
        } else {
            self.fields.push(field);
        }
        self
    }

    pub fn match_exact(
        self,
        name: impl Into<String>,
        value: impl Into<ValueTypes>,
    ) -> Self {
        self.push_field(MatchEntryField::exact(name, value))
    }

    pub fn match_ternary(
        mut self,
        name: impl Into<String>,
        val: u64,
        mask: u64,
    ) -> Self {
        match MatchEntryField::ternary(name, val, mask) {
            Ok(field) => self.push_field(field),
            Err(e) => {
                self.defect = Some(e);
                self
            }
        }
    }

    pub fn match_lpm(self, name: impl Into<String>, net: Ipv6Net) -> Self {
        self.push_field(MatchEntryField::lpm(name, net))
    }

    /// Give the entry a direct action.
    pub fn action(mut self, action: ActionData) -> Self {
        self.action = Some(action);
        self
    }

    /// Point the entry at an action-profile group instead of a direct
    /// action.
    pub fn group(mut self, group_id: u16) -> Self {
        self.group = Some(group_id);
        self
    }

    pub fn build(self) -> MatResult<EntryRequest> {
        if let Some(defect) = self.defect {
            return Err(defect);
        }
        if self.fields.is_empty() {
            return Err(MatError::BadMatch(format!(
                "entry for {} has no match fields",
                self.table
            )));
        }
        let action = match (self.action, self.group) {
            (Some(action), None) => EntryAction::Direct(action),
            (None, Some(id)) => EntryAction::Group(id),
            (Some(_), Some(_)) => {
                return Err(MatError::InvalidArg(
                    "entry has both an action and a group".to_string(),
                ))
            }
            (None, None) => {
                return Err(MatError::InvalidArg(
                    "entry has neither an action nor a group".to_string(),
                ))
            }
        };
        Ok(EntryRequest {
            table: self.table,
            key: MatchData {
                fields: self.fields,
            },
            action,
        })
    }
}

/// One member of an action-profile group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub action: ActionData,
    pub weight: u16,
}

/// A fully validated request to create one action-profile group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRequest {
    /// The action profile this group belongs to.
    pub profile: String,
    pub group_id: u16,
    pub members: Vec<GroupMember>,
}

impl GroupRequest {
    pub fn profile(
        profile: impl Into<String>,
        group_id: u16,
    ) -> GroupBuilder {
        GroupBuilder {
            profile: profile.into(),
            group_id,
            members: Vec::new(),
        }
    }
}

impl fmt::Display for GroupRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} group {} ({} members)",
            self.profile,
            self.group_id,
            self.members.len()
        )
    }
}

pub struct GroupBuilder {
    profile: String,
    group_id: u16,
    members: Vec<GroupMember>,
}

impl GroupBuilder {
    pub fn member(self, action: ActionData) -> Self {
        self.weighted_member(action, 1)
    }

    pub fn weighted_member(mut self, action: ActionData, weight: u16) -> Self {
        self.members.push(GroupMember { action, weight });
        self
    }

    pub fn build(self) -> MatResult<GroupRequest> {
        if self.members.is_empty() {
            return Err(MatError::InvalidArg(format!(
                "group {} has no members",
                self.group_id
            )));
        }
        if self.members.iter().any(|m| m.weight == 0) {
            return Err(MatError::InvalidArg(format!(
                "group {} has a zero-weight member",
                self.group_id
            )));
        }
        Ok(GroupRequest {
            profile: self.profile,
            group_id: self.group_id,
            members: self.members,
        })
    }
}
