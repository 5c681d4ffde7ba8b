// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! A backend that accepts valid programming and forwards nothing.  Useful
//! for exercising the programming surface (and the harness timeout path)
//! without any packet processing behind it.

use parking_lot::Mutex;
use slog::debug;

use mat::{
    EntryRequest, GroupRequest, MatError, MatResult, MatchData, PipelineOps,
};

use crate::store::TableStore;
use crate::PacketIo;

pub struct StubPipeline {
    store: Mutex<TableStore>,
    ports: u16,
    log: slog::Logger,
}

impl StubPipeline {
    pub fn new(ports: u16, log: slog::Logger) -> StubPipeline {
        StubPipeline {
            store: Mutex::new(TableStore::new()),
            ports,
            log,
        }
    }
}

impl PipelineOps for StubPipeline {
    fn entry_add(&self, entry: &EntryRequest) -> MatResult<()> {
        self.store.lock().entry_add(entry)
    }

    fn entry_del(&self, table: &str, key: &MatchData) -> MatResult<()> {
        self.store.lock().entry_del(table, key)
    }

    fn group_add(&self, group: &GroupRequest) -> MatResult<()> {
        self.store.lock().group_add(group)
    }

    fn group_del(&self, group_id: u16) -> MatResult<()> {
        self.store.lock().group_del(group_id)
    }

    fn table_clear(&self, table: &str) -> MatResult<()> {
        self.store.lock().table_clear(table)
    }

    fn table_occupancy(&self, table: &str) -> MatResult<usize> {
        self.store.lock().table_occupancy(table)
    }

    fn group_count(&self) -> usize {
        self.store.lock().groups.len()
    }

    fn reset_all(&self) -> MatResult<()> {
        self.store.lock().reset_all();
        Ok(())
    }
}

impl PacketIo for StubPipeline {
    fn port_count(&self) -> u16 {
        self.ports
    }

    fn packet_send(&self, port: u16, data: &[u8]) -> MatResult<()> {
        if port >= self.ports {
            return Err(MatError::InvalidArg(format!("no such port: {port}")));
        }
        debug!(self.log, "stub dropping packet";
            "port" => port,
            "bytes" => data.len());
        Ok(())
    }

    fn packet_collect(&self) -> Vec<(u16, Vec<u8>)> {
        Vec::new()
    }
}
