// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Configuration for a conformance run.
//!
//! The identities of the simulated devices are ordinary data handed to
//! each scenario, not process-wide constants.  Defaults match the
//! two-switch topology the suite models; a TOML file (via
//! `FABRIC_TEST_CONFIG`) and individual environment variables can
//! override them.

use std::net::Ipv6Addr;
use std::time::Duration;

use serde::Deserialize;

use common::MacAddr;

use crate::{HarnessError, HarnessResult};

/// The layer-2 and layer-3 identity of one simulated device.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct DeviceIdent {
    pub mac: MacAddr,
    pub ip: Ipv6Addr,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// The device under test: the router whose station MAC and address
    /// the scenarios program.
    pub switch1: DeviceIdent,
    /// The simulated peer acting as the next hop.
    pub switch2: DeviceIdent,
    /// Default ingress port for injected packets.
    pub port1: u16,
    /// Default egress port for routed packets.
    pub port2: u16,
    /// How long packet verification waits before declaring a timeout.
    pub packet_timeout_ms: u64,
    /// 0 terse, higher values make the harness chattier.
    pub verbosity: u8,
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfig {
            switch1: DeviceIdent {
                mac: MacAddr::new(0x00, 0xaa, 0x00, 0x00, 0x00, 0x01),
                ip: "2001:0:1::1".parse().unwrap(),
            },
            switch2: DeviceIdent {
                mac: MacAddr::new(0x00, 0xaa, 0x00, 0x00, 0x00, 0x02),
                ip: "2001:0:2::1".parse().unwrap(),
            },
            port1: 1,
            port2: 2,
            packet_timeout_ms: 500,
            verbosity: 0,
        }
    }
}

impl TestConfig {
    pub fn packet_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_timeout_ms)
    }

    /// Load a config file, falling back to defaults for absent fields.
    pub fn load(path: &str) -> HarnessResult<TestConfig> {
        let txt = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("failed to read {path}: {e}"))
        })?;
        toml::from_str(&txt)
            .map_err(|e| HarnessError::Config(format!("{path}: {e}")))
    }

    /// Build the config for this run: the file named by
    /// `FABRIC_TEST_CONFIG` if set, then per-knob environment overrides.
    pub fn from_env() -> HarnessResult<TestConfig> {
        let mut config = match std::env::var("FABRIC_TEST_CONFIG") {
            Ok(path) => Self::load(&path)?,
            Err(_) => TestConfig::default(),
        };

        if let Ok(millis) = std::env::var("FABRIC_TEST_TIMEOUT") {
            config.packet_timeout_ms = millis.parse().map_err(|_| {
                HarnessError::Config(format!("invalid timeout: {millis}"))
            })?;
        }
        if let Ok(verbosity) = std::env::var("FABRIC_TEST_VERBOSITY") {
            config.verbosity = verbosity.parse().map_err(|_| {
                HarnessError::Config(format!("invalid verbosity: {verbosity}"))
            })?;
        }
        Ok(config)
    }
}
