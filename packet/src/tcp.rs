// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::ipv6;
use crate::pbuf::ParseBuffer;
use crate::{construct_error, parse_error};
use crate::{Endpoint, Headers, Packet, PacketResult};

pub const TCP_HDR_SIZE: usize = 20;

pub const TCP_FLAG_FIN: u16 = 0x001;
pub const TCP_FLAG_SYN: u16 = 0x002;
pub const TCP_FLAG_RST: u16 = 0x004;
pub const TCP_FLAG_PSH: u16 = 0x008;
pub const TCP_FLAG_ACK: u16 = 0x010;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TcpHdr {
    pub tcp_sport: u16,
    pub tcp_dport: u16,
    pub tcp_seq: u32,
    pub tcp_ack: u32,
    pub tcp_flags: u16, // 9 bits
    pub tcp_win: u16,
    pub tcp_urg: u16,
    /// Raw option bytes, if the data offset exceeds the fixed header.
    pub tcp_options: Vec<u8>,
}

impl TcpHdr {
    pub fn size(&self) -> usize {
        TCP_HDR_SIZE + self.tcp_options.len()
    }

    pub fn parse(pb: &mut ParseBuffer) -> PacketResult<Headers> {
        let tcp_sport = pb.get_u16()?;
        let tcp_dport = pb.get_u16()?;
        let tcp_seq = pb.get_u32()?;
        let tcp_ack = pb.get_u32()?;
        let off_flags = pb.get_u16()?;
        let doff = (off_flags >> 12) as usize;
        if doff < 5 {
            return Err(parse_error(pb, format!("bad data offset: {doff}")));
        }
        let tcp_flags = off_flags & 0x1ff;
        let tcp_win = pb.get_u16()?;
        let _cksum = pb.get_u16()?;
        let tcp_urg = pb.get_u16()?;
        let tcp_options = pb.get_bytes((doff - 5) * 4)?;

        let mut hdrs = Headers::new();
        hdrs.tcp_hdr = Some(TcpHdr {
            tcp_sport,
            tcp_dport,
            tcp_seq,
            tcp_ack,
            tcp_flags,
            tcp_win,
            tcp_urg,
            tcp_options,
        });
        Ok(hdrs)
    }

    pub fn deparse(pkt: &Packet, trailing: usize) -> PacketResult<BytesMut> {
        let hdr = pkt
            .hdrs
            .tcp_hdr
            .as_ref()
            .ok_or_else(|| construct_error("no TCP header"))?;
        if hdr.tcp_options.len() % 4 != 0 {
            return Err(construct_error("TCP options not 32-bit aligned"));
        }

        let mut v = ipv6::Ipv6Hdr::deparse(pkt, hdr.size() + trailing)?;

        let mut own = Vec::with_capacity(hdr.size());
        own.extend_from_slice(&hdr.tcp_sport.to_be_bytes());
        own.extend_from_slice(&hdr.tcp_dport.to_be_bytes());
        own.extend_from_slice(&hdr.tcp_seq.to_be_bytes());
        own.extend_from_slice(&hdr.tcp_ack.to_be_bytes());
        let doff = 5 + hdr.tcp_options.len() / 4;
        let off_flags = ((doff as u16) << 12) | (hdr.tcp_flags & 0x1ff);
        own.extend_from_slice(&off_flags.to_be_bytes());
        own.extend_from_slice(&hdr.tcp_win.to_be_bytes());
        own.extend_from_slice(&[0, 0]); // checksum placeholder
        own.extend_from_slice(&hdr.tcp_urg.to_be_bytes());
        own.extend_from_slice(&hdr.tcp_options);

        let body: &[u8] = pkt.body.as_deref().unwrap_or(&[]);
        let v6 = pkt.hdrs.ipv6_hdr.as_ref().unwrap();
        let cksum =
            ipv6::Ipv6Hdr::pseudo_checksum(v6, ipv6::IPPROTO_TCP, &[&own, body]);
        own[16..18].copy_from_slice(&cksum);

        v.put_slice(&own);
        Ok(v)
    }

    pub(crate) fn gen(
        src: Endpoint,
        dst: Endpoint,
        body: Option<&[u8]>,
    ) -> PacketResult<Packet> {
        let mut pkt = Packet::new(body);
        pkt.hdrs.tcp_hdr = Some(TcpHdr {
            tcp_sport: src.port,
            tcp_dport: dst.port,
            tcp_seq: 0,
            tcp_ack: 0,
            tcp_flags: TCP_FLAG_SYN,
            tcp_win: 8192,
            tcp_urg: 0,
            tcp_options: Vec::new(),
        });
        Ok(pkt)
    }
}

impl fmt::Display for TcpHdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp {} -> {}", self.tcp_sport, self.tcp_dport)
    }
}
