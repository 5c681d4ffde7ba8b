// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The forwarding behavior of the soft pipeline, applied to one packet at a
//! time against the installed table state.

use std::net::Ipv6Addr;

use common::MacAddr;
use mat::{
    ActionData, EntryAction, MatchEntryValue, MatchLpm, ValueTypes,
};
use packet::eth::EthHdr;
use packet::icmp6::{self, Icmp6Msg, ICMP6_NEIGHBOR_SOLICIT};
use packet::ipv6::Ipv6Hdr;
use packet::Packet;

use crate::profile;
use crate::store::{TableSlot, TableStore};

// The selection hash matches the hardware: CRC-8 with the default
// polynomial over dst addr, src addr, dst port, src port, masked to 6 bits.
const ECMP_HASH_POLY: u8 = 0x07;
const ECMP_HASH_MASK: u8 = 0x3f;

pub(crate) fn process(
    store: &TableStore,
    ingress: u16,
    pkt: &Packet,
) -> Vec<(u16, Packet)> {
    if let Some(na) = ndp_reply(store, pkt) {
        return vec![(ingress, na)];
    }
    match route(store, pkt) {
        Some(out) => out,
        None => Vec::new(),
    }
}

// Answer a Neighbor Solicitation whose target has an ndp_reply entry.
fn ndp_reply(store: &TableStore, pkt: &Packet) -> Option<Packet> {
    let hdr = pkt.hdrs.icmp6_hdr.as_ref()?;
    if hdr.icmp6_type != ICMP6_NEIGHBOR_SOLICIT {
        return None;
    }
    let Icmp6Msg::NeighborSolicit { ns_target, .. } = &hdr.icmp6_msg else {
        return None;
    };

    let action = exact_lookup(
        store,
        profile::NDP_REPLY_TABLE,
        &ValueTypes::from(*ns_target),
    )?;
    let router_mac = action_mac(action, "router_mac")?;

    let eth = pkt.hdrs.eth_hdr.as_ref()?;
    let v6 = pkt.hdrs.ipv6_hdr.as_ref()?;
    Some(icmp6::gen_neighbor_advert(
        *ns_target,
        router_mac,
        eth.eth_smac,
        v6.v6_src,
    ))
}

// The routing chain: station match, LPM lookup, next-hop selection, MAC
// rewrite and hop-limit decrement, then the egress port lookup.
fn route(store: &TableStore, pkt: &Packet) -> Option<Vec<(u16, Packet)>> {
    let eth = pkt.hdrs.eth_hdr.as_ref()?;
    exact_lookup(
        store,
        profile::MY_STATION_TABLE,
        &ValueTypes::from(eth.eth_dmac),
    )?;

    let v6 = pkt.hdrs.ipv6_hdr.as_ref()?;
    if v6.v6_hop_limit <= 1 {
        return None;
    }

    let nexthop = match lpm_lookup(store, v6.v6_dst)? {
        EntryAction::Direct(action) => action_mac(action, "dmac")?,
        EntryAction::Group(gid) => {
            let group = store.groups.get(gid)?;
            let member = select_member(group, pkt);
            action_mac(member, "dmac")?
        }
    };

    let mut out = pkt.clone();
    // the station MAC the packet was addressed to becomes the source
    EthHdr::rewrite_smac(&mut out, eth.eth_dmac);
    EthHdr::rewrite_dmac(&mut out, nexthop);
    Ipv6Hdr::adjust_hlim(&mut out, -1);

    let egress = exact_lookup(
        store,
        profile::L2_EXACT_TABLE,
        &ValueTypes::from(nexthop),
    )?;
    let port = match egress.arg_by_name("port").ok()?.value {
        ValueTypes::U64(p) => p as u16,
        ValueTypes::Ptr(_) => return None,
    };

    Some(vec![(port, out)])
}

fn slot_action<'a>(slot: &'a TableSlot) -> Option<&'a ActionData> {
    match &slot.action {
        EntryAction::Direct(action) => Some(action),
        EntryAction::Group(_) => None,
    }
}

// Single-field exact lookup, returning the entry's direct action.
fn exact_lookup<'a>(
    store: &'a TableStore,
    table: &str,
    value: &ValueTypes,
) -> Option<&'a ActionData> {
    store
        .table(table)
        .ok()?
        .iter()
        .find(|slot| {
            matches!(&slot.key.fields[0].value,
                MatchEntryValue::Value(v) if v == value)
        })
        .and_then(slot_action)
}

// Longest-prefix lookup in the route table.
fn lpm_lookup(store: &TableStore, dst: Ipv6Addr) -> Option<&EntryAction> {
    let dst: u128 = dst.into();
    store
        .table(profile::ROUTE_V6_TABLE)
        .ok()?
        .iter()
        .filter_map(|slot| match &slot.key.fields[0].value {
            MatchEntryValue::Lpm(lpm) if lpm_covers(lpm, dst) => {
                Some((lpm.len, &slot.action))
            }
            _ => None,
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, action)| action)
}

fn lpm_covers(lpm: &MatchLpm, dst: u128) -> bool {
    let prefix = match u128::try_from(&lpm.prefix) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let mask = match lpm.len {
        0 => 0,
        len => u128::MAX << (128 - len),
    };
    dst & mask == prefix & mask
}

// Pick a group member by hashing the flow, honoring member weights.
fn select_member<'a>(
    group: &'a mat::GroupRequest,
    pkt: &Packet,
) -> &'a ActionData {
    let mut data = Vec::with_capacity(36);
    let v6 = pkt.hdrs.ipv6_hdr.as_ref().unwrap();
    data.extend_from_slice(&v6.v6_dst.octets());
    data.extend_from_slice(&v6.v6_src.octets());
    if let Some(tcp) = &pkt.hdrs.tcp_hdr {
        data.extend_from_slice(&tcp.tcp_dport.to_be_bytes());
        data.extend_from_slice(&tcp.tcp_sport.to_be_bytes());
    } else if let Some(udp) = &pkt.hdrs.udp_hdr {
        data.extend_from_slice(&udp.udp_dport.to_be_bytes());
        data.extend_from_slice(&udp.udp_sport.to_be_bytes());
    }

    let mut crc = crc8::Crc8::create_msb(ECMP_HASH_POLY);
    let hash = crc.calc(&data, data.len() as i32, 0);

    let total: u32 = group.members.iter().map(|m| m.weight as u32).sum();
    let mut slot = (hash & ECMP_HASH_MASK) as u32 % total;
    for member in &group.members {
        if slot < member.weight as u32 {
            return &member.action;
        }
        slot -= member.weight as u32;
    }
    // slot < total, so the walk always terminates inside the list
    unreachable!();
}

fn action_mac(action: &ActionData, arg: &str) -> Option<MacAddr> {
    MacAddr::try_from(&action.arg_by_name(arg).ok()?.value).ok()
}
