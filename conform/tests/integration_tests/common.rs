// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use lazy_static::lazy_static;
use parking_lot::{Mutex, MutexGuard};

use ::common::logging;
use conform::{TestBed, TestConfig};
use fabric::soft::SoftPipeline;
use packet::{eth, ipv6, Endpoint, Packet};

pub type TestResult = Result<(), anyhow::Error>;

// The test bed storing all shared test state.
lazy_static! {
    static ref TEST_BED: Mutex<TestBed<SoftPipeline>> = {
        let config =
            TestConfig::from_env().expect("invalid test configuration");
        let log = logging::test_logger();
        let backend = SoftPipeline::new(
            fabric::soft::DEFAULT_PORT_COUNT,
            log.new(slog::o!("unit" => "soft-pipeline")),
        );
        Mutex::new(TestBed::new(backend, config, log))
    };
}

/// Return the shared test bed.  All forwarding state on the device is
/// cleared before it is handed out, so every test starts from a blank
/// slate.
pub fn get_testbed() -> MutexGuard<'static, TestBed<SoftPipeline>> {
    let bed = TEST_BED.lock();
    bed.reset().expect("failed to reset test bed");
    bed
}

pub fn gen_tcp_packet(src: Endpoint, dst: Endpoint) -> Packet {
    Packet::gen(
        src,
        dst,
        vec![ipv6::IPPROTO_TCP.into(), eth::ETHER_IPV6],
        None,
    )
    .unwrap()
}

pub fn gen_udp_packet(src: Endpoint, dst: Endpoint) -> Packet {
    Packet::gen(
        src,
        dst,
        vec![ipv6::IPPROTO_UDP.into(), eth::ETHER_IPV6],
        None,
    )
    .unwrap()
}

pub fn gen_icmp6_packet(src: Endpoint, dst: Endpoint) -> Packet {
    Packet::gen(
        src,
        dst,
        vec![ipv6::IPPROTO_ICMPV6.into(), eth::ETHER_IPV6],
        None,
    )
    .unwrap()
}

/// The endpoints most scenarios route between.
pub fn flow_endpoints() -> (Endpoint, Endpoint) {
    (
        Endpoint::parse("e0:d5:5e:67:89:ab", "fd00:1122:7788:0101::4", 3333)
            .unwrap(),
        Endpoint::parse("e0:d5:5e:67:89:ac", "fd00:1122:3344:0101::5", 4444)
            .unwrap(),
    )
}
