// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The fabric pipeline: its table profile and the software backends that
//! implement it.
//!
//! The profile describes the five programmable objects of the IPv6 fabric
//! pipeline (station table, LPM route table with an ECMP selector, L2
//! egress table, NDP reply table) in terms the `mat` abstraction can
//! validate requests against.  Two backends implement `mat::PipelineOps`
//! over that profile:
//!
//! - `soft`: a reference pipeline that actually forwards packets between
//!   ports according to the installed state, capturing emitted packets on
//!   an internal queue.  The conformance suite runs against this backend.
//! - `stub`: accepts valid programming and forwards nothing, for tests
//!   that only exercise the programming surface.

use mat::MatResult;

pub mod profile;
pub mod soft;
mod store;
pub mod stub;

/// Raw packet I/O on the ports of a pipeline backend.  The harness layers
/// its timeout and comparison logic on top of this.
pub trait PacketIo {
    /// The number of ports the backend exposes; valid ports are
    /// `0..port_count()`.
    fn port_count(&self) -> u16;

    /// Inject a packet into the pipeline on the given ingress port.
    fn packet_send(&self, port: u16, data: &[u8]) -> MatResult<()>;

    /// Drain the packets the pipeline has emitted since the last call,
    /// paired with their egress ports.
    fn packet_collect(&self) -> Vec<(u16, Vec<u8>)>;
}
