// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Automatic generation of NDP Neighbor Advertisements for IPv6 addresses
//! associated with the switch interface.

use std::net::Ipv6Addr;

use common::MacAddr;
use conform::skip_unless;
use conform::{oracle, tables, PhysPort};
use packet::icmp6;

use crate::integration_tests::common::{get_testbed, TestResult};

fn host_mac() -> MacAddr {
    "e0:d5:5e:67:89:ab".parse().unwrap()
}

fn host_ip() -> Ipv6Addr {
    "2001:0:1::10".parse().unwrap()
}

#[test]
fn test_ndp_reply() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();

    // transform solicitations for the switch address into advertisements
    // carrying the switch MAC
    let mut scope = bed.scope();
    tables::ndp_reply::add(&mut scope, cfg.switch1.ip, cfg.switch1.mac)?;

    let ns =
        icmp6::gen_neighbor_solicit(host_mac(), host_ip(), cfg.switch1.ip);
    let expected = oracle::ndp_advertisement(&ns, cfg.switch1.mac)?;

    // send the solicitation, expect the advertisement on the same port
    bed.packet_send(PhysPort(cfg.port1), &ns)?;
    bed.verify_packet(&expected, PhysPort(cfg.port1))?;
    Ok(())
}

#[test]
fn test_ndp_unknown_target() -> TestResult {
    skip_unless!("routing");
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let mut scope = bed.scope();
    tables::ndp_reply::add(&mut scope, cfg.switch1.ip, cfg.switch1.mac)?;

    // solicit an address the table doesn't cover
    let other: Ipv6Addr = "2001:0:1::99".parse()?;
    let ns = icmp6::gen_neighbor_solicit(host_mac(), host_ip(), other);

    bed.packet_send(PhysPort(cfg.port1), &ns)?;
    bed.verify_no_packet(PhysPort(cfg.port1))?;
    Ok(())
}

// Re-running the NDP scenario with a fresh program/cleanup cycle yields
// the same advertisement.
#[test]
fn test_ndp_reply_idempotent() -> TestResult {
    skip_unless!("routing");
    for _ in 0..2 {
        test_ndp_reply()?;
    }
    Ok(())
}
