// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The test bed: one device under test plus the packet I/O needed to
//! exercise it.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use slog::debug;

use fabric::PacketIo;
use mat::PipelineOps;
use packet::Packet;

use crate::config::TestConfig;
use crate::diff::packet_diff;
use crate::scope::ProgramScope;
use crate::{HarnessError, HarnessResult};

// How often collected packets are polled while waiting for a verdict.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Physical port number on the device under test.
#[derive(Clone, Copy, PartialOrd, Ord, Hash, PartialEq, Eq)]
pub struct PhysPort(pub u16);

impl fmt::Display for PhysPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PhysPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct TestBed<B: PipelineOps + PacketIo> {
    backend: B,
    pub config: TestConfig,
    pub log: slog::Logger,
}

impl<B: PipelineOps + PacketIo> TestBed<B> {
    pub fn new(backend: B, config: TestConfig, log: slog::Logger) -> Self {
        TestBed {
            backend,
            config,
            log,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open a programming scope.  State installed through it is removed
    /// when the scope is dropped or rolled back.
    pub fn scope(&self) -> ProgramScope<'_, B> {
        ProgramScope::new(&self.backend, self.log.clone())
    }

    /// Wipe all forwarding state and any uncollected packets, returning
    /// the device to a blank slate between tests.
    pub fn reset(&self) -> HarnessResult<()> {
        self.backend.reset_all()?;
        self.backend.packet_collect();
        Ok(())
    }

    /// Inject a packet on the given port.
    pub fn packet_send(
        &self,
        port: PhysPort,
        pkt: &Packet,
    ) -> HarnessResult<()> {
        debug!(self.log, "sending packet"; "port" => %port, "packet" => %pkt);
        let data = pkt.deparse()?;
        self.backend.packet_send(port.0, &data)?;
        Ok(())
    }

    /// Block until `expected` appears on `port` or the timeout passes.
    /// The first packet observed decides the verdict: an equal packet on
    /// the right port passes, anything else fails with a field-level diff
    /// or an unexpected-packet report.  There are no retries.
    pub fn verify_packet(
        &self,
        expected: &Packet,
        port: PhysPort,
    ) -> HarnessResult<()> {
        let timeout = self.config.packet_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            for (p, data) in self.backend.packet_collect() {
                let pkt = Packet::parse(&data)?;
                if p != port.0 {
                    return Err(HarnessError::UnexpectedPacket {
                        port: p,
                        packet: pkt.to_string(),
                    });
                }
                let diff = packet_diff(expected, &pkt);
                if !diff.is_empty() {
                    return Err(HarnessError::AssertionMismatch {
                        port: p,
                        diff,
                    });
                }
                debug!(self.log, "verified packet"; "port" => %port);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::VerificationTimeout {
                    port: port.0,
                    waited: timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Block for the whole timeout and fail if any packet shows up on
    /// `port`.
    pub fn verify_no_packet(&self, port: PhysPort) -> HarnessResult<()> {
        let deadline = Instant::now() + self.config.packet_timeout();
        loop {
            for (p, data) in self.backend.packet_collect() {
                if p == port.0 {
                    let pkt = Packet::parse(&data)?;
                    return Err(HarnessError::UnexpectedPacket {
                        port: p,
                        packet: pkt.to_string(),
                    });
                }
            }
            if Instant::now() >= deadline {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
