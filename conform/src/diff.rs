// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Field-level comparison of two packets, used to report an observed
//! packet that differs from the expectation.

use std::fmt;

use packet::Packet;

#[derive(Debug)]
pub struct FieldDiff {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Default)]
pub struct PacketDiff {
    pub fields: Vec<FieldDiff>,
}

impl PacketDiff {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn check(
        &mut self,
        field: &str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) {
        let expected = expected.to_string();
        let actual = actual.to_string();
        if expected != actual {
            self.fields.push(FieldDiff {
                field: field.to_string(),
                expected,
                actual,
            });
        }
    }
}

impl fmt::Display for PacketDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.fields {
            writeln!(
                f,
                "  {}: expected {}, saw {}",
                d.field, d.expected, d.actual
            )?;
        }
        Ok(())
    }
}

fn fmt_opt<T: fmt::Display>(v: Option<&T>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "absent".to_string(),
    }
}

/// Compare two packets header by header.  The result is empty iff the
/// packets are equal.
pub fn packet_diff(expected: &Packet, actual: &Packet) -> PacketDiff {
    let mut diff = PacketDiff::default();

    match (&expected.hdrs.eth_hdr, &actual.hdrs.eth_hdr) {
        (Some(e), Some(a)) => {
            diff.check("eth.dst_mac", e.eth_dmac, a.eth_dmac);
            diff.check("eth.src_mac", e.eth_smac, a.eth_smac);
            diff.check(
                "eth.vlan",
                fmt_opt(e.eth_8021q.map(|q| q.eth_vlan_tag).as_ref()),
                fmt_opt(a.eth_8021q.map(|q| q.eth_vlan_tag).as_ref()),
            );
            diff.check(
                "eth.type",
                format!("{:#06x}", e.eth_type),
                format!("{:#06x}", a.eth_type),
            );
        }
        (e, a) => diff.check("eth", fmt_opt(e.as_ref()), fmt_opt(a.as_ref())),
    }

    match (&expected.hdrs.ipv6_hdr, &actual.hdrs.ipv6_hdr) {
        (Some(e), Some(a)) => {
            diff.check("ipv6.src", e.v6_src, a.v6_src);
            diff.check("ipv6.dst", e.v6_dst, a.v6_dst);
            diff.check("ipv6.hop_limit", e.v6_hop_limit, a.v6_hop_limit);
            diff.check("ipv6.next_hdr", e.v6_next_hdr, a.v6_next_hdr);
            diff.check("ipv6.class", e.v6_class, a.v6_class);
            diff.check("ipv6.flow", e.v6_flow, a.v6_flow);
        }
        (e, a) => diff.check("ipv6", fmt_opt(e.as_ref()), fmt_opt(a.as_ref())),
    }

    match (&expected.hdrs.tcp_hdr, &actual.hdrs.tcp_hdr) {
        (Some(e), Some(a)) => {
            diff.check("tcp.src_port", e.tcp_sport, a.tcp_sport);
            diff.check("tcp.dst_port", e.tcp_dport, a.tcp_dport);
            diff.check("tcp.seq", e.tcp_seq, a.tcp_seq);
            diff.check("tcp.ack", e.tcp_ack, a.tcp_ack);
            diff.check(
                "tcp.flags",
                format!("{:#05x}", e.tcp_flags),
                format!("{:#05x}", a.tcp_flags),
            );
            diff.check("tcp.window", e.tcp_win, a.tcp_win);
        }
        (e, a) => diff.check("tcp", fmt_opt(e.as_ref()), fmt_opt(a.as_ref())),
    }

    match (&expected.hdrs.udp_hdr, &actual.hdrs.udp_hdr) {
        (Some(e), Some(a)) => {
            diff.check("udp.src_port", e.udp_sport, a.udp_sport);
            diff.check("udp.dst_port", e.udp_dport, a.udp_dport);
        }
        (e, a) => diff.check("udp", fmt_opt(e.as_ref()), fmt_opt(a.as_ref())),
    }

    match (&expected.hdrs.icmp6_hdr, &actual.hdrs.icmp6_hdr) {
        (Some(e), Some(a)) => {
            diff.check("icmp6.type", e.icmp6_type, a.icmp6_type);
            diff.check("icmp6.code", e.icmp6_code, a.icmp6_code);
            if e.icmp6_msg != a.icmp6_msg {
                diff.check(
                    "icmp6.msg",
                    format!("{:?}", e.icmp6_msg),
                    format!("{:?}", a.icmp6_msg),
                );
            }
        }
        (e, a) => {
            diff.check("icmp6", fmt_opt(e.as_ref()), fmt_opt(a.as_ref()))
        }
    }

    let fmt_body = |b: &Option<Vec<u8>>| match b {
        Some(b) => format!("{} bytes: {b:02x?}", b.len()),
        None => "absent".to_string(),
    };
    if expected.body != actual.body {
        diff.check("body", fmt_body(&expected.body), fmt_body(&actual.body));
    }

    diff
}
