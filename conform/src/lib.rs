// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Black-box conformance harness for the IPv6 fabric pipeline.
//!
//! A conformance test programs forwarding state through a `ProgramScope`
//! (which guarantees the state is torn down again, pass or fail), injects
//! a packet on one port of the device under test, and verifies that the
//! packet the pipeline is documented to produce — computed by the pure
//! `oracle` transforms from the input packet — appears on the expected
//! port within a timeout.  The device under test is anything implementing
//! `mat::PipelineOps` + `fabric::PacketIo`; the suite in `tests/` runs
//! against the in-process `fabric::soft` reference backend.

pub mod config;
pub mod diff;
pub mod group;
pub mod harness;
pub mod oracle;
pub mod scope;
pub mod tables;
mod types;

pub use config::DeviceIdent;
pub use config::TestConfig;
pub use harness::PhysPort;
pub use harness::TestBed;
pub use scope::ProgramScope;
pub use types::HarnessError;
pub use types::HarnessResult;
