// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! A software rendition of the fabric pipeline.
//!
//! Installed state lives in an in-memory table store; packets injected
//! through `PacketIo::packet_send` run the forwarding logic synchronously
//! and anything the pipeline emits is queued for `packet_collect`.

use parking_lot::Mutex;
use slog::{debug, info};

use mat::{
    EntryRequest, GroupRequest, MatError, MatResult, MatchData, PipelineOps,
};
use packet::Packet;

use crate::store::TableStore;
use crate::PacketIo;

mod forward;

/// The default number of ports the soft pipeline exposes.
pub const DEFAULT_PORT_COUNT: u16 = 32;

struct State {
    store: TableStore,
    captured: Vec<(u16, Vec<u8>)>,
}

pub struct SoftPipeline {
    state: Mutex<State>,
    ports: u16,
    log: slog::Logger,
}

impl SoftPipeline {
    pub fn new(ports: u16, log: slog::Logger) -> SoftPipeline {
        info!(log, "creating soft pipeline"; "ports" => ports);
        SoftPipeline {
            state: Mutex::new(State {
                store: TableStore::new(),
                captured: Vec::new(),
            }),
            ports,
            log,
        }
    }
}

impl PipelineOps for SoftPipeline {
    fn entry_add(&self, entry: &EntryRequest) -> MatResult<()> {
        self.state.lock().store.entry_add(entry)?;
        debug!(self.log, "installed entry"; "entry" => %entry);
        Ok(())
    }

    fn entry_del(&self, table: &str, key: &MatchData) -> MatResult<()> {
        self.state.lock().store.entry_del(table, key)?;
        debug!(self.log, "removed entry";
            "table" => %table, "key" => %key);
        Ok(())
    }

    fn group_add(&self, group: &GroupRequest) -> MatResult<()> {
        self.state.lock().store.group_add(group)?;
        debug!(self.log, "installed group"; "group" => %group);
        Ok(())
    }

    fn group_del(&self, group_id: u16) -> MatResult<()> {
        self.state.lock().store.group_del(group_id)?;
        debug!(self.log, "removed group"; "group_id" => group_id);
        Ok(())
    }

    fn table_clear(&self, table: &str) -> MatResult<()> {
        self.state.lock().store.table_clear(table)
    }

    fn table_occupancy(&self, table: &str) -> MatResult<usize> {
        self.state.lock().store.table_occupancy(table)
    }

    fn group_count(&self) -> usize {
        self.state.lock().store.groups.len()
    }

    fn reset_all(&self) -> MatResult<()> {
        let mut state = self.state.lock();
        state.store.reset_all();
        state.captured.clear();
        debug!(self.log, "reset all pipeline state");
        Ok(())
    }
}

impl PacketIo for SoftPipeline {
    fn port_count(&self) -> u16 {
        self.ports
    }

    fn packet_send(&self, port: u16, data: &[u8]) -> MatResult<()> {
        if port >= self.ports {
            return Err(MatError::InvalidArg(format!("no such port: {port}")));
        }
        let pkt = match Packet::parse(data) {
            Ok(pkt) => pkt,
            Err(e) => {
                // the real pipeline silently drops frames it can't parse
                debug!(self.log, "dropping unparseable packet";
                    "port" => port,
                    "error" => %e);
                return Ok(());
            }
        };

        let mut state = self.state.lock();
        let emitted = forward::process(&state.store, port, &pkt);
        for (egress, out) in emitted {
            debug!(self.log, "pipeline emitted packet";
                "ingress" => port,
                "egress" => egress,
                "packet" => %out);
            let data = out.deparse().map_err(|e| {
                MatError::Internal(format!("deparse failed: {e}"))
            })?;
            state.captured.push((egress, data.to_vec()));
        }
        Ok(())
    }

    fn packet_collect(&self) -> Vec<(u16, Vec<u8>)> {
        self.state.lock().captured.split_off(0)
    }
}
