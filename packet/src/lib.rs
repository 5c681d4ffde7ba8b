// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! A layered packet model for the IPv6 conformance suite.
//!
//! A `Packet` is a set of optional headers plus an opaque body.  Parsing
//! starts at the Ethernet layer and walks inward; each layer parses its own
//! fields and dispatches to the next based on the ethertype / next-header
//! value.  Deparsing runs the other way: the innermost present header is
//! asked to serialize the packet, and it recursively asks the layers outside
//! it to lay down their bytes first.
//!
//! Length and checksum fields are computed at deparse time and ignored at
//! parse time, so two packets compare equal iff their semantic fields and
//! bodies are equal.

use std::fmt;
use std::net::Ipv6Addr;

use bytes::BytesMut;
use thiserror::Error;

pub mod eth;
pub mod icmp6;
pub mod ipv6;
pub mod pbuf;
pub mod tcp;
pub mod udp;

pub use common::MacAddr;
pub use pbuf::ParseBuffer;

#[derive(Debug, Error)]
pub enum PacketError {
    /// The byte stream couldn't be interpreted as a packet.
    #[error("parse error at byte {offset}: {msg}")]
    Parse { offset: usize, msg: String },
    /// The requested packet couldn't be built.
    #[error("cannot construct packet: {0}")]
    Construct(String),
}

pub type PacketResult<T> = Result<T, PacketError>;

pub(crate) fn parse_error(
    pb: &ParseBuffer,
    msg: impl Into<String>,
) -> PacketError {
    PacketError::Parse {
        offset: pb.offset(),
        msg: msg.into(),
    }
}

pub(crate) fn construct_error(msg: impl Into<String>) -> PacketError {
    PacketError::Construct(msg.into())
}

/// One end of a flow: who sends or receives a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub mac: MacAddr,
    pub ip: Ipv6Addr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(mac: MacAddr, ip: Ipv6Addr, port: u16) -> Endpoint {
        Endpoint { mac, ip, port }
    }

    /// Build an endpoint from string representations of its addresses.
    pub fn parse(mac: &str, ip: &str, port: u16) -> PacketResult<Endpoint> {
        let mac = mac
            .parse()
            .map_err(|e| construct_error(format!("bad mac {mac}: {e}")))?;
        let ip = ip
            .parse()
            .map_err(|e| construct_error(format!("bad ip {ip}: {e}")))?;
        Ok(Endpoint { mac, ip, port })
    }
}

/// All the headers a packet may carry, outermost first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Headers {
    pub eth_hdr: Option<eth::EthHdr>,
    pub ipv6_hdr: Option<ipv6::Ipv6Hdr>,
    pub tcp_hdr: Option<tcp::TcpHdr>,
    pub udp_hdr: Option<udp::UdpHdr>,
    pub icmp6_hdr: Option<icmp6::Icmp6Hdr>,
}

impl Headers {
    pub fn new() -> Headers {
        Default::default()
    }

    /// Total size of all present headers on the wire.
    pub fn size(&self) -> usize {
        self.eth_hdr.as_ref().map_or(0, |h| h.size())
            + self.ipv6_hdr.as_ref().map(|_| ipv6::IPV6_HDR_SIZE).unwrap_or(0)
            + self.tcp_hdr.as_ref().map_or(0, |h| h.size())
            + self.udp_hdr.as_ref().map(|_| udp::UDP_HDR_SIZE).unwrap_or(0)
            + self.icmp6_hdr.as_ref().map_or(0, |h| h.size())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Packet {
    pub hdrs: Headers,
    pub body: Option<Vec<u8>>,
}

impl Packet {
    pub fn new(body: Option<&[u8]>) -> Packet {
        Packet {
            hdrs: Headers::new(),
            body: body.map(|b| b.to_vec()),
        }
    }

    /// Generate a packet from a protocol stack.  `protos` lists protocol
    /// identifiers innermost first, ending with the ethertype:
    /// `vec![ipv6::IPPROTO_TCP.into(), eth::ETHER_IPV6]` describes a TCP
    /// segment in an IPv6 packet in an Ethernet frame.
    pub fn gen(
        src: Endpoint,
        dst: Endpoint,
        mut protos: Vec<u16>,
        body: Option<&[u8]>,
    ) -> PacketResult<Packet> {
        match protos.pop() {
            Some(eth::ETHER_IPV6) => {
                let mut pkt = ipv6::Ipv6Hdr::gen(src, dst, protos, body)?;
                pkt.hdrs.eth_hdr = Some(eth::EthHdr {
                    eth_dmac: dst.mac,
                    eth_smac: src.mac,
                    eth_8021q: None,
                    eth_type: eth::ETHER_IPV6,
                });
                Ok(pkt)
            }
            Some(x) => {
                Err(construct_error(format!("unsupported ethertype: {x:#x}")))
            }
            None => Err(construct_error("empty protocol stack")),
        }
    }

    /// Parse a byte stream into a packet.  Any bytes beyond the recognized
    /// headers become the body.
    pub fn parse(data: &[u8]) -> PacketResult<Packet> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdrs = eth::EthHdr::parse(&mut pb)?;
        let body = match pb.bytes_left() {
            0 => None,
            n => Some(pb.get_bytes(n)?),
        };
        Ok(Packet { hdrs, body })
    }

    /// Serialize the packet, computing lengths and checksums.
    pub fn deparse(&self) -> PacketResult<BytesMut> {
        let body_len = self.body.as_ref().map_or(0, |b| b.len());

        let mut v = if self.hdrs.icmp6_hdr.is_some() {
            icmp6::Icmp6Hdr::deparse(self, body_len)?
        } else if self.hdrs.tcp_hdr.is_some() {
            tcp::TcpHdr::deparse(self, body_len)?
        } else if self.hdrs.udp_hdr.is_some() {
            udp::UdpHdr::deparse(self, body_len)?
        } else if self.hdrs.ipv6_hdr.is_some() {
            ipv6::Ipv6Hdr::deparse(self, body_len)?
        } else if self.hdrs.eth_hdr.is_some() {
            eth::EthHdr::deparse(self, body_len)?
        } else {
            return Err(construct_error("packet has no headers"));
        };

        if let Some(body) = &self.body {
            v.extend_from_slice(body);
        }
        Ok(v)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(h) = &self.hdrs.eth_hdr {
            write!(f, "{h}")?;
        }
        if let Some(h) = &self.hdrs.ipv6_hdr {
            write!(f, " {h}")?;
        }
        if let Some(h) = &self.hdrs.tcp_hdr {
            write!(f, " {h}")?;
        }
        if let Some(h) = &self.hdrs.udp_hdr {
            write!(f, " {h}")?;
        }
        if let Some(h) = &self.hdrs.icmp6_hdr {
            write!(f, " {h}")?;
        }
        match &self.body {
            Some(b) => write!(f, " body: {} bytes", b.len()),
            None => write!(f, " no body"),
        }
    }
}
