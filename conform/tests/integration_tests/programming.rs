// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The programming surface: invalid table specifications must be rejected
//! with the precise error, and a pipeline that forwards nothing must turn
//! into a verification timeout, not a hang.

use ::common::logging;
use ::common::MacAddr;
use conform::{tables, HarnessError, PhysPort, TestBed, TestConfig};
use fabric::profile;
use fabric::stub::StubPipeline;
use mat::{ActionData, EntryRequest, GroupRequest, MatError, PipelineOps};
use packet::eth::EthHdr;

use crate::integration_tests::common;
use crate::integration_tests::common::{get_testbed, TestResult};

fn mac() -> MacAddr {
    "02:aa:bb:cc:dd:ee".parse().unwrap()
}

#[test]
fn test_unknown_table() -> TestResult {
    let bed = get_testbed();
    let entry = EntryRequest::table("ingress.l9.bogus")
        .match_exact("dst_mac", mac())
        .action(ActionData::new(profile::ACT_NO_ACTION))
        .build()?;
    assert!(matches!(
        bed.backend().entry_add(&entry),
        Err(MatError::NoSuchTable(_))
    ));
    Ok(())
}

#[test]
fn test_unknown_action() -> TestResult {
    let bed = get_testbed();
    let entry = EntryRequest::table(profile::MY_STATION_TABLE)
        .match_exact("dst_mac", mac())
        .action(ActionData::new("drop_everything"))
        .build()?;
    assert!(matches!(
        bed.backend().entry_add(&entry),
        Err(MatError::NoSuchAction { .. })
    ));
    Ok(())
}

#[test]
fn test_wrong_match_kind() -> TestResult {
    let bed = get_testbed();
    // the station table is an exact match; offer it a ternary key
    let entry = EntryRequest::table(profile::MY_STATION_TABLE)
        .match_ternary("dst_mac", 0x02aa_0000_0000, 0xffff_0000_0000)
        .action(ActionData::new(profile::ACT_NO_ACTION))
        .build()?;
    assert!(matches!(
        bed.backend().entry_add(&entry),
        Err(MatError::BadMatch(_))
    ));
    Ok(())
}

#[test]
fn test_dangling_group_reference() -> TestResult {
    let bed = get_testbed();
    let entry = EntryRequest::table(profile::ROUTE_V6_TABLE)
        .match_lpm("dst_addr", "fd00::/64".parse()?)
        .group(42)
        .build()?;
    assert!(matches!(
        bed.backend().entry_add(&entry),
        Err(MatError::NoSuchGroup(42))
    ));
    Ok(())
}

#[test]
fn test_unknown_selector_profile() -> TestResult {
    let bed = get_testbed();
    let group = GroupRequest::profile("ingress.l3.bogus_selector", 1)
        .member(ActionData::new(profile::ACT_SET_NEXT_HOP).with_arg(
            "dmac",
            mac(),
        ))
        .build()?;
    assert!(matches!(
        bed.backend().group_add(&group),
        Err(MatError::NoSuchTable(_))
    ));
    Ok(())
}

// Malformed specifications never reach the device: the builder catches
// them at construction.
#[test]
fn test_builder_catches_malformed() -> TestResult {
    let err = EntryRequest::table(profile::MY_STATION_TABLE)
        .match_ternary("dst_mac", 0xff, 0x0f)
        .action(ActionData::new(profile::ACT_NO_ACTION))
        .build()
        .unwrap_err();
    assert!(matches!(err, MatError::BadMatch(_)));

    let err = EntryRequest::table(profile::ROUTE_V6_TABLE)
        .match_lpm("dst_addr", "fd00::/64".parse()?)
        .build()
        .unwrap_err();
    assert!(matches!(err, MatError::InvalidArg(_)));
    Ok(())
}

// A fully programmed chain on a pipeline that forwards nothing: the
// expected packet never shows up and verification times out.
#[test]
fn test_verification_timeout() -> TestResult {
    let log = logging::test_logger();
    let config = TestConfig {
        packet_timeout_ms: 50,
        ..Default::default()
    };
    let cfg = config.clone();
    let bed = TestBed::new(StubPipeline::new(8, log.clone()), config, log);

    let (src, dst) = common::flow_endpoints();
    let mut pkt = common::gen_udp_packet(src, dst);
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::route_v6::add_via_nexthop(
        &mut scope,
        oxnet::Ipv6Net::new(dst.ip, 128)?,
        cfg.switch2.mac,
    )?;
    tables::l2_exact::add(&mut scope, cfg.switch2.mac, cfg.port2)?;

    let expected = conform::oracle::routed(&pkt, cfg.switch2.mac)?;
    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    let err = bed
        .verify_packet(&expected, PhysPort(cfg.port2))
        .unwrap_err();
    assert!(matches!(err, HarnessError::VerificationTimeout { .. }));
    Ok(())
}

// An observed packet that differs from the expectation is reported with a
// field-level diff naming what moved.
#[test]
fn test_assertion_mismatch_diff() -> TestResult {
    let bed = get_testbed();
    let cfg = bed.config.clone();

    let (src, dst) = common::flow_endpoints();
    let mut pkt = common::gen_udp_packet(src, dst);
    EthHdr::rewrite_dmac(&mut pkt, cfg.switch1.mac);

    let mut scope = bed.scope();
    tables::my_station::add(&mut scope, cfg.switch1.mac)?;
    tables::route_v6::add_via_nexthop(
        &mut scope,
        oxnet::Ipv6Net::new(dst.ip, 128)?,
        cfg.switch2.mac,
    )?;
    tables::l2_exact::add(&mut scope, cfg.switch2.mac, cfg.port2)?;

    // deliberately expect the un-transformed input
    bed.packet_send(PhysPort(cfg.port1), &pkt)?;
    let err = bed.verify_packet(&pkt, PhysPort(cfg.port2)).unwrap_err();
    match err {
        HarnessError::AssertionMismatch { diff, .. } => {
            let fields: Vec<&str> =
                diff.fields.iter().map(|d| d.field.as_str()).collect();
            assert!(fields.contains(&"eth.dst_mac"));
            assert!(fields.contains(&"eth.src_mac"));
            assert!(fields.contains(&"ipv6.hop_limit"));
        }
        x => panic!("expected mismatch, got {x:?}"),
    }
    Ok(())
}
