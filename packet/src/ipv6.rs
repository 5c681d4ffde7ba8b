// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;
use std::net::Ipv6Addr;

use bytes::{BufMut, BytesMut};

use crate::pbuf::ParseBuffer;
use crate::{construct_error, parse_error};
use crate::{eth, icmp6, tcp, udp};
use crate::{Endpoint, Headers, Packet, PacketResult};

pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ICMPV6: u8 = 58;
pub const IPPROTO_NONE: u8 = 59;

pub const IPV6_HDR_SIZE: usize = 40;

/// Hop limit applied to generated packets.
pub const DEFAULT_HOP_LIMIT: u8 = 255;

/// The fixed IPv6 header.  The payload length is derived from the layers
/// inside at deparse time and is not stored here.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ipv6Hdr {
    pub v6_class: u8,
    pub v6_flow: u32, // 20 bits
    pub v6_next_hdr: u8,
    pub v6_hop_limit: u8,
    pub v6_src: Ipv6Addr,
    pub v6_dst: Ipv6Addr,
}

impl Ipv6Hdr {
    /// Adjust the hop limit by `delta`, as a router would when forwarding.
    pub fn adjust_hlim(pkt: &mut Packet, delta: i16) {
        if let Some(hdr) = pkt.hdrs.ipv6_hdr.as_mut() {
            hdr.v6_hop_limit = (hdr.v6_hop_limit as i16 + delta) as u8;
        }
    }

    pub fn rewrite_src(pkt: &mut Packet, ip: Ipv6Addr) {
        if let Some(hdr) = pkt.hdrs.ipv6_hdr.as_mut() {
            hdr.v6_src = ip;
        }
    }

    pub fn rewrite_dst(pkt: &mut Packet, ip: Ipv6Addr) {
        if let Some(hdr) = pkt.hdrs.ipv6_hdr.as_mut() {
            hdr.v6_dst = ip;
        }
    }

    pub fn parse(pb: &mut ParseBuffer) -> PacketResult<Headers> {
        let version = pb.get_bits(4)?;
        if version != 6 {
            return Err(parse_error(
                pb,
                format!("bad IPv6 version: {version}"),
            ));
        }
        let v6_class = pb.get_bits(8)? as u8;
        let v6_flow = pb.get_bits(20)?;
        let _payload_len = pb.get_u16()?;
        let v6_next_hdr = pb.get_u8()?;
        let v6_hop_limit = pb.get_u8()?;
        let v6_src = pb.get_ipv6()?;
        let v6_dst = pb.get_ipv6()?;

        let mut hdrs = match v6_next_hdr {
            IPPROTO_TCP => tcp::TcpHdr::parse(pb)?,
            IPPROTO_UDP => udp::UdpHdr::parse(pb)?,
            IPPROTO_ICMPV6 => icmp6::Icmp6Hdr::parse(pb)?,
            _ => Headers::new(),
        };
        hdrs.ipv6_hdr = Some(Ipv6Hdr {
            v6_class,
            v6_flow,
            v6_next_hdr,
            v6_hop_limit,
            v6_src,
            v6_dst,
        });
        Ok(hdrs)
    }

    pub fn deparse(pkt: &Packet, trailing: usize) -> PacketResult<BytesMut> {
        let hdr = pkt
            .hdrs
            .ipv6_hdr
            .as_ref()
            .ok_or_else(|| construct_error("no IPv6 header"))?;

        let mut v = eth::EthHdr::deparse(pkt, IPV6_HDR_SIZE + trailing)?;
        v.put_u32(
            (6u32 << 28)
                | ((hdr.v6_class as u32) << 20)
                | (hdr.v6_flow & 0xfffff),
        );
        v.put_u16(trailing as u16);
        v.put_u8(hdr.v6_next_hdr);
        v.put_u8(hdr.v6_hop_limit);
        v.put_slice(&hdr.v6_src.octets());
        v.put_slice(&hdr.v6_dst.octets());
        Ok(v)
    }

    pub(crate) fn gen(
        src: Endpoint,
        dst: Endpoint,
        mut protos: Vec<u16>,
        body: Option<&[u8]>,
    ) -> PacketResult<Packet> {
        let (mut pkt, v6_next_hdr) = match protos.pop() {
            Some(x) if x == IPPROTO_TCP as u16 => {
                (tcp::TcpHdr::gen(src, dst, body)?, IPPROTO_TCP)
            }
            Some(x) if x == IPPROTO_UDP as u16 => {
                (udp::UdpHdr::gen(src, dst, body)?, IPPROTO_UDP)
            }
            Some(x) if x == IPPROTO_ICMPV6 as u16 => {
                (icmp6::Icmp6Hdr::gen(protos, body)?, IPPROTO_ICMPV6)
            }
            Some(x) => {
                return Err(construct_error(format!(
                    "unsupported IPv6 payload protocol: {x}"
                )))
            }
            None => (Packet::new(body), IPPROTO_NONE),
        };

        pkt.hdrs.ipv6_hdr = Some(Ipv6Hdr {
            v6_class: 0,
            v6_flow: 0,
            v6_next_hdr,
            v6_hop_limit: DEFAULT_HOP_LIMIT,
            v6_src: src.ip,
            v6_dst: dst.ip,
        });
        Ok(pkt)
    }

    /// RFC 2460 upper-layer checksum: the IPv6 pseudo-header followed by the
    /// upper-layer slices (header with a zeroed checksum field, then body).
    pub(crate) fn pseudo_checksum(
        hdr: &Ipv6Hdr,
        proto: u8,
        upper: &[&[u8]],
    ) -> [u8; 2] {
        let upper_len: u32 = upper.iter().map(|s| s.len() as u32).sum();
        let mut c = internet_checksum::Checksum::new();
        c.add_bytes(&hdr.v6_src.octets());
        c.add_bytes(&hdr.v6_dst.octets());
        c.add_bytes(&upper_len.to_be_bytes());
        c.add_bytes(&[0, 0, 0, proto]);
        for s in upper {
            c.add_bytes(s);
        }
        c.checksum()
    }
}

impl fmt::Display for Ipv6Hdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ipv6 {} -> {} hlim {}",
            self.v6_src, self.v6_dst, self.v6_hop_limit
        )
    }
}
