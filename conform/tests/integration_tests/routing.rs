// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! IPv6 routing conformance: the station / ECMP-group / LPM / L2-exact
//! chain, exercised for each supported packet type.

use std::net::Ipv6Addr;

use oxnet::Ipv6Net;

use ::common::MacAddr;
use conform::skip_unless;
use conform::{oracle, tables, PhysPort, TestBed};
use fabric::soft::SoftPipeline;
use mat::PipelineOps;
use packet::eth::EthHdr;
use packet::ipv6::Ipv6Hdr;
use packet::{Endpoint, Packet};

use crate::integration_tests::common;
use crate::integration_tests::common::{get_testbed, TestResult};

// Program the full forwarding chain for one destination and push the
// packet through it: the expected output is the oracle's routing
// transformation of the input.
fn test_packet(bed: &TestBed<SoftPipeline>, mut pkt: Packet) -> TestResult {
    let cfg = bed.config.clone();
    let next_hop = cfg.switch2.mac;

    // the input packet is addressed to the router's station MAC
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);
    let dst = pkt.hdrs.ipv6_hdr.as_ref().unwrap().v6_dst;

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::ecmp::add_group(&mut scope, 1, &[next_hop])?;
    tables::route_v6::add_via_group(&mut scope, Ipv6Net::new(dst, 128)?, 1)?;
    tables::l2_exact::add(&mut scope, next_hop, cfg.port2)?;

    let expected = oracle::routed(&pkt, next_hop)?;
    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    bed.verify_packet(&expected, PhysPort(cfg.port2))?;
    Ok(())
}

#[test]
fn test_tcpv6_unicast() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let (src, dst) = common::flow_endpoints();
    test_packet(&bed, common::gen_tcp_packet(src, dst))
}

#[test]
fn test_udpv6_unicast() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let (src, dst) = common::flow_endpoints();
    test_packet(&bed, common::gen_udp_packet(src, dst))
}

#[test]
fn test_icmpv6_unicast() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let (src, dst) = common::flow_endpoints();
    test_packet(&bed, common::gen_icmp6_packet(src, dst))
}

// The same chain with the route's action applied directly, no group
// indirection.
#[test]
fn test_direct_route() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();
    let next_hop = cfg.switch2.mac;

    let (src, dst) = common::flow_endpoints();
    let mut pkt = common::gen_udp_packet(src, dst);
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::route_v6::add_via_nexthop(
        &mut scope,
        Ipv6Net::new(dst.ip, 128)?,
        next_hop,
    )?;
    tables::l2_exact::add(&mut scope, next_hop, cfg.port2)?;

    let expected = oracle::routed(&pkt, next_hop)?;
    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    bed.verify_packet(&expected, PhysPort(cfg.port2))?;
    Ok(())
}

// Two routes with different prefix lengths; the packet matches both and
// must follow the more specific one.
fn lpm_specificity_case(hit_long: bool) -> TestResult {
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let short_net: Ipv6Net = "fd00:1122:3344:0100::/56".parse()?;
    let short_mac = MacAddr::random();
    let short_port = 11;
    let long_net: Ipv6Net = "fd00:1122:3344:0101::/64".parse()?;
    let long_mac = MacAddr::random();
    let long_port = 12;

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::route_v6::add_via_nexthop(&mut scope, short_net, short_mac)?;
    tables::route_v6::add_via_nexthop(&mut scope, long_net, long_mac)?;
    tables::l2_exact::add(&mut scope, short_mac, short_port)?;
    tables::l2_exact::add(&mut scope, long_mac, long_port)?;

    // inside /56; inside /64 only when the long route should win
    let dst_ip = if hit_long {
        "fd00:1122:3344:0101::5"
    } else {
        "fd00:1122:3344:0107::5"
    };
    let src = Endpoint::parse("e0:d5:5e:67:89:ab", "fd00:7::1", 3333)?;
    let dst = Endpoint::parse("e0:d5:5e:67:89:ac", dst_ip, 4444)?;
    let mut pkt = common::gen_udp_packet(src, dst);
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);

    let (next_hop, egress) = if hit_long {
        (long_mac, long_port)
    } else {
        (short_mac, short_port)
    };
    let expected = oracle::routed(&pkt, next_hop)?;
    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    bed.verify_packet(&expected, PhysPort(egress))?;
    Ok(())
}

#[test]
fn test_short_hit_unicast() -> TestResult {
    skip_unless!("routing");
    lpm_specificity_case(false)
}

#[test]
fn test_long_hit_unicast() -> TestResult {
    skip_unless!("routing");
    lpm_specificity_case(true)
}

// Replicate the pipeline's path-selection hash: CRC-8 with the default
// polynomial over dst addr, src addr, dst port, src port, masked to 6
// bits and reduced modulo the member count.
fn expected_member(
    src_ip: Ipv6Addr,
    dst_ip: Ipv6Addr,
    src_port: u16,
    dst_port: u16,
    members: usize,
) -> usize {
    let mut data = [0u8; 36];
    data[0..16].copy_from_slice(&dst_ip.octets());
    data[16..32].copy_from_slice(&src_ip.octets());
    data[32..34].copy_from_slice(&dst_port.to_be_bytes());
    data[34..36].copy_from_slice(&src_port.to_be_bytes());

    let mut crc8 = crc8::Crc8::create_msb(0x07);
    let hash = crc8.calc(&data, data.len() as i32, 0);
    (hash & 0x3f) as usize % members
}

/// Attempt to send a packet with 1-4 different possible next hops.
#[test]
fn test_multipath_traffic() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();
    let cidr: Ipv6Net = "fd00:1122:3344:0100::/56".parse()?;

    let src_ip: Ipv6Addr = "fd00:1122:7788:0101::10".parse()?;
    let dst_ip: Ipv6Addr = "fd00:1122:3344:0100::12".parse()?;
    let src_port = 3333u16;
    let dst_port = 4444u16;

    let macs: Vec<MacAddr> = (0..4)
        .map(|x| format!("02:78:39:45:b9:{x:02x}").parse().unwrap())
        .collect();

    // Incrementally grow the multipath set, testing packet transfers with
    // each subset along the way.
    for n in 1..=macs.len() {
        let mut scope = bed.scope();
        tables::my_station::add(&mut scope, cfg.switch1.mac)?;
        tables::ecmp::add_group(&mut scope, n as u16, &macs[0..n])?;
        tables::route_v6::add_via_group(&mut scope, cidr, n as u16)?;
        for (i, mac) in macs[0..n].iter().enumerate() {
            tables::l2_exact::add(&mut scope, *mac, 10 + i as u16)?;
        }

        let selected =
            expected_member(src_ip, dst_ip, src_port, dst_port, n);

        let src = Endpoint::new("e0:d5:5e:67:89:ab".parse()?, src_ip, src_port);
        let dst = Endpoint::new("e0:d5:5e:67:89:ac".parse()?, dst_ip, dst_port);
        let mut pkt = common::gen_udp_packet(src, dst);
        EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);

        let expected = oracle::routed(&pkt, macs[selected])?;
        bed.packet_send(PhysPort(cfg.port1), &pkt)?;
        bed.verify_packet(&expected, PhysPort(10 + selected as u16))?;
        scope.rollback();
    }
    Ok(())
}

// A destination with no matching LPM entry produces no output packet.
#[test]
fn test_unrouteable() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let (src, dst) = common::flow_endpoints();
    let mut pkt = common::gen_udp_packet(src, dst);
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    // a route for an unrelated prefix, so the table isn't empty
    tables::route_v6::add_via_nexthop(
        &mut scope,
        "fd00:9999::/64".parse()?,
        cfg.switch2.mac,
    )?;
    tables::l2_exact::add(&mut scope, cfg.switch2.mac, cfg.port2)?;

    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    bed.verify_no_packet(PhysPort(cfg.port2))?;
    Ok(())
}

// A packet that arrives with hop limit 1 cannot be forwarded.
#[test]
fn test_hop_limit_expired() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let (src, dst) = common::flow_endpoints();
    let mut pkt = common::gen_udp_packet(src, dst);
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);
    Ipv6Hdr::adjust_hlim(&mut pkt, -254); // 255 -> 1

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::route_v6::add_via_nexthop(
        &mut scope,
        Ipv6Net::new(dst.ip, 128)?,
        cfg.switch2.mac,
    )?;
    tables::l2_exact::add(&mut scope, cfg.switch2.mac, cfg.port2)?;

    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    bed.verify_no_packet(PhysPort(cfg.port2))?;
    Ok(())
}

// Frames not addressed to the station MAC are never routed.
#[test]
fn test_station_miss() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let (src, dst) = common::flow_endpoints();
    // dst.mac stays e0:d5:5e:67:89:ac, which is not the station MAC
    let pkt = common::gen_udp_packet(src, dst);

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::route_v6::add_via_nexthop(
        &mut scope,
        Ipv6Net::new(dst.ip, 128)?,
        cfg.switch2.mac,
    )?;
    tables::l2_exact::add(&mut scope, cfg.switch2.mac, cfg.port2)?;

    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    bed.verify_no_packet(PhysPort(cfg.port2))?;
    Ok(())
}

// Running the same scenario twice, each run with its own program/cleanup
// cycle, must leave no residue and produce identical results.
#[test]
fn test_rerun_is_clean() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();

    let occupancy = |bed: &TestBed<SoftPipeline>| -> usize {
        fabric::profile::TABLES
            .iter()
            .map(|t| bed.backend().table_occupancy(t.name).unwrap())
            .sum()
    };

    for _ in 0..2 {
        let (src, dst) = common::flow_endpoints();
        test_packet(&bed, common::gen_udp_packet(src, dst))?;
        assert_eq!(occupancy(&bed), 0, "table entries leaked across runs");
        assert_eq!(
            bed.backend().group_count(),
            0,
            "groups leaked across runs"
        );
    }
    Ok(())
}
