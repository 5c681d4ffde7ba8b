// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The failure taxonomy of a conformance test.

use std::time::Duration;

use crate::diff::PacketDiff;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The device rejected a table entry or group.  Fatal to the test; no
    /// retry.
    #[error("programming error: {0}")]
    Programming(#[from] mat::MatError),
    /// The expected packet was not observed before the deadline.
    #[error("no packet seen on port {port} within {waited:?}")]
    VerificationTimeout { port: u16, waited: Duration },
    /// A packet was observed on the right port but differs from the
    /// expectation.
    #[error("packet on port {port} differs from expectation:\n{diff}")]
    AssertionMismatch { port: u16, diff: PacketDiff },
    /// A packet appeared where none was expected.
    #[error("unexpected packet on port {port}: {packet}")]
    UnexpectedPacket { port: u16, packet: String },
    /// The input packet doesn't support the requested transformation or
    /// couldn't be built or parsed.
    #[error("packet error: {0}")]
    Packet(#[from] packet::PacketError),
    /// The harness configuration couldn't be loaded.
    #[error("bad configuration: {0}")]
    Config(String),
}
