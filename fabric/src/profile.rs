// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The programmable surface of the fabric pipeline.
//!
//! Packets whose destination MAC hits `ingress.l2.my_station` are routed:
//! the IPv6 destination is looked up in `ingress.l3.route_v6` (longest
//! prefix wins), which either rewrites the next-hop MAC directly or
//! selects a member from an `ingress.l3.ecmp_selector` group.  The
//! rewritten destination MAC then picks the egress port out of
//! `ingress.l2.exact`.  Neighbor Solicitations for addresses present in
//! `ingress.ndp.reply` are answered with a synthesized Advertisement
//! before any routing happens.

use mat::{
    ActionData, EntryAction, EntryRequest, GroupRequest, MatError, MatResult,
    MatchEntryValue, MatchType,
};

pub const MY_STATION_TABLE: &str = "ingress.l2.my_station";
pub const ROUTE_V6_TABLE: &str = "ingress.l3.route_v6";
pub const L2_EXACT_TABLE: &str = "ingress.l2.exact";
pub const NDP_REPLY_TABLE: &str = "ingress.ndp.reply";

/// The action profile backing multipath route entries.
pub const ECMP_SELECTOR: &str = "ingress.l3.ecmp_selector";

pub const ACT_NO_ACTION: &str = "no_action";
pub const ACT_SET_NEXT_HOP: &str = "set_next_hop";
pub const ACT_SET_OUTPUT_PORT: &str = "set_output_port";
pub const ACT_NDP_ADVERTISEMENT: &str = "ndp_advertisement";

#[derive(Debug)]
pub struct FieldSchema {
    pub name: &'static str,
    pub match_type: MatchType,
    pub width: u16,
}

#[derive(Debug)]
pub struct ActionSchema {
    pub name: &'static str,
    /// (name, width in bits) for each parameter, in order
    pub params: &'static [(&'static str, u16)],
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSchema],
    pub actions: &'static [ActionSchema],
    /// The action profile whose groups entries may reference, if any
    pub selector: Option<&'static str>,
    pub size: usize,
}

// All tables are defined to be 1024 entries deep
const TABLE_SIZE: usize = 1024;

/// Actions selectable by members of the ECMP profile.
pub const SELECTOR_ACTIONS: [ActionSchema; 1] = [ActionSchema {
    name: ACT_SET_NEXT_HOP,
    params: &[("dmac", 48)],
}];

pub const TABLES: [TableSchema; 4] = [
    TableSchema {
        name: MY_STATION_TABLE,
        fields: &[FieldSchema {
            name: "dst_mac",
            match_type: MatchType::Exact,
            width: 48,
        }],
        actions: &[ActionSchema {
            name: ACT_NO_ACTION,
            params: &[],
        }],
        selector: None,
        size: TABLE_SIZE,
    },
    TableSchema {
        name: ROUTE_V6_TABLE,
        fields: &[FieldSchema {
            name: "dst_addr",
            match_type: MatchType::Lpm,
            width: 128,
        }],
        actions: &[ActionSchema {
            name: ACT_SET_NEXT_HOP,
            params: &[("dmac", 48)],
        }],
        selector: Some(ECMP_SELECTOR),
        size: TABLE_SIZE,
    },
    TableSchema {
        name: L2_EXACT_TABLE,
        fields: &[FieldSchema {
            name: "dst_mac",
            match_type: MatchType::Exact,
            width: 48,
        }],
        actions: &[ActionSchema {
            name: ACT_SET_OUTPUT_PORT,
            params: &[("port", 16)],
        }],
        selector: None,
        size: TABLE_SIZE,
    },
    TableSchema {
        name: NDP_REPLY_TABLE,
        fields: &[FieldSchema {
            name: "target_addr",
            match_type: MatchType::Exact,
            width: 128,
        }],
        actions: &[ActionSchema {
            name: ACT_NDP_ADVERTISEMENT,
            params: &[("router_mac", 48)],
        }],
        selector: None,
        size: TABLE_SIZE,
    },
];

pub fn table(name: &str) -> Option<&'static TableSchema> {
    TABLES.iter().find(|t| t.name == name)
}

fn validate_action(
    table: &str,
    actions: &[ActionSchema],
    action: &ActionData,
) -> MatResult<()> {
    let schema = actions
        .iter()
        .find(|a| a.name == action.action)
        .ok_or_else(|| MatError::NoSuchAction {
            table: table.to_string(),
            action: action.action.clone(),
        })?;

    for (name, width) in schema.params {
        let arg = action.args.iter().find(|a| a.name == *name).ok_or_else(
            || {
                MatError::InvalidArg(format!(
                    "action {} is missing parameter {name}",
                    action.action
                ))
            },
        )?;
        if arg.value.width() > *width {
            return Err(MatError::InvalidArg(format!(
                "parameter {name} of action {} exceeds {width} bits",
                action.action
            )));
        }
    }
    if action.args.len() != schema.params.len() {
        return Err(MatError::InvalidArg(format!(
            "action {} takes {} parameters, got {}",
            action.action,
            schema.params.len(),
            action.args.len()
        )));
    }
    Ok(())
}

/// Check a table entry against the pipeline profile.
pub fn validate_entry(entry: &EntryRequest) -> MatResult<()> {
    let schema = table(&entry.table)
        .ok_or_else(|| MatError::NoSuchTable(entry.table.clone()))?;

    for field in &entry.key.fields {
        let fs = schema
            .fields
            .iter()
            .find(|f| f.name == field.name)
            .ok_or_else(|| {
                MatError::BadMatch(format!(
                    "table {} has no field {}",
                    entry.table, field.name
                ))
            })?;
        if field.value.match_type() != fs.match_type {
            return Err(MatError::BadMatch(format!(
                "field {} of table {} is a {} match, got {}",
                field.name,
                entry.table,
                fs.match_type,
                field.value.match_type()
            )));
        }
        if field.value.width() > fs.width {
            return Err(MatError::BadMatch(format!(
                "field {} of table {} exceeds {} bits",
                field.name, entry.table, fs.width
            )));
        }
        if let MatchEntryValue::Lpm(lpm) = &field.value {
            if lpm.len > fs.width {
                return Err(MatError::BadMatch(format!(
                    "prefix length {} of field {} exceeds {} bits",
                    lpm.len, field.name, fs.width
                )));
            }
        }
    }
    for fs in schema.fields {
        if !entry.key.fields.iter().any(|f| f.name == fs.name) {
            return Err(MatError::BadMatch(format!(
                "entry for table {} is missing field {}",
                entry.table, fs.name
            )));
        }
    }

    match &entry.action {
        EntryAction::Direct(action) => {
            validate_action(&entry.table, schema.actions, action)
        }
        EntryAction::Group(_) => match schema.selector {
            Some(_) => Ok(()),
            None => Err(MatError::InvalidArg(format!(
                "table {} does not support group actions",
                entry.table
            ))),
        },
    }
}

/// Check an action-profile group against the pipeline profile.
pub fn validate_group(group: &GroupRequest) -> MatResult<()> {
    if group.profile != ECMP_SELECTOR {
        return Err(MatError::NoSuchTable(group.profile.clone()));
    }
    for member in &group.members {
        validate_action(&group.profile, &SELECTOR_ACTIONS, &member.action)?;
    }
    Ok(())
}
