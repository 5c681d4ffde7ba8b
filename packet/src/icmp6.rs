// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! ICMPv6, including the two Neighbor Discovery messages the conformance
//! suite exercises (RFC 4443, RFC 4861).

use std::fmt;
use std::net::Ipv6Addr;

use bytes::{BufMut, BytesMut};

use common::network::{multicast_mac_addr, solicited_node_addr};

use crate::eth::{self, EthHdr};
use crate::ipv6::{self, Ipv6Hdr};
use crate::pbuf::ParseBuffer;
use crate::{construct_error, parse_error, MacAddr};
use crate::{Headers, Packet, PacketResult};

pub const ICMP6_ECHO_REQUEST: u8 = 128;
pub const ICMP6_ECHO_REPLY: u8 = 129;
pub const ICMP6_NEIGHBOR_SOLICIT: u8 = 135;
pub const ICMP6_NEIGHBOR_ADVERT: u8 = 136;

pub const NDP_OPT_SOURCE_LLADDR: u8 = 1;
pub const NDP_OPT_TARGET_LLADDR: u8 = 2;

pub const NA_FLAG_ROUTER: u8 = 0x80;
pub const NA_FLAG_SOLICITED: u8 = 0x40;
pub const NA_FLAG_OVERRIDE: u8 = 0x20;

// type + code + checksum
const ICMP6_FIXED_SIZE: usize = 4;
// reserved/flags word + target address
const NDP_MSG_SIZE: usize = 20;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NdpOption {
    SourceLinkLayer(MacAddr),
    TargetLinkLayer(MacAddr),
    Other { opt_type: u8, data: Vec<u8> },
}

impl NdpOption {
    fn size(&self) -> usize {
        match self {
            NdpOption::SourceLinkLayer(_) | NdpOption::TargetLinkLayer(_) => 8,
            NdpOption::Other { data, .. } => 2 + data.len(),
        }
    }

    fn parse(pb: &mut ParseBuffer) -> PacketResult<NdpOption> {
        let opt_type = pb.get_u8()?;
        let opt_len = pb.get_u8()? as usize;
        if opt_len == 0 {
            return Err(parse_error(pb, "zero-length NDP option"));
        }
        match (opt_type, opt_len) {
            (NDP_OPT_SOURCE_LLADDR, 1) => {
                Ok(NdpOption::SourceLinkLayer(pb.get_mac()?))
            }
            (NDP_OPT_TARGET_LLADDR, 1) => {
                Ok(NdpOption::TargetLinkLayer(pb.get_mac()?))
            }
            _ => Ok(NdpOption::Other {
                opt_type,
                data: pb.get_bytes(opt_len * 8 - 2)?,
            }),
        }
    }

    fn deparse_into(&self, v: &mut Vec<u8>) {
        match self {
            NdpOption::SourceLinkLayer(mac) => {
                v.push(NDP_OPT_SOURCE_LLADDR);
                v.push(1);
                v.extend_from_slice(&mac.to_vec());
            }
            NdpOption::TargetLinkLayer(mac) => {
                v.push(NDP_OPT_TARGET_LLADDR);
                v.push(1);
                v.extend_from_slice(&mac.to_vec());
            }
            NdpOption::Other { opt_type, data } => {
                v.push(*opt_type);
                v.push(((2 + data.len()) / 8) as u8);
                v.extend_from_slice(data);
            }
        }
    }
}

/// The message-specific portion of an ICMPv6 packet.  Echo payload bytes
/// beyond the identifier live in the packet body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Icmp6Msg {
    Echo {
        icmp6_id: u16,
        icmp6_seq: u16,
    },
    NeighborSolicit {
        ns_target: Ipv6Addr,
        ns_options: Vec<NdpOption>,
    },
    NeighborAdvert {
        na_flags: u8,
        na_target: Ipv6Addr,
        na_options: Vec<NdpOption>,
    },
    Other(Vec<u8>),
}

impl Icmp6Msg {
    fn size(&self) -> usize {
        match self {
            Icmp6Msg::Echo { .. } => 4,
            Icmp6Msg::NeighborSolicit { ns_options, .. } => {
                NDP_MSG_SIZE + ns_options.iter().map(|o| o.size()).sum::<usize>()
            }
            Icmp6Msg::NeighborAdvert { na_options, .. } => {
                NDP_MSG_SIZE + na_options.iter().map(|o| o.size()).sum::<usize>()
            }
            Icmp6Msg::Other(data) => data.len(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Icmp6Hdr {
    pub icmp6_type: u8,
    pub icmp6_code: u8,
    pub icmp6_msg: Icmp6Msg,
}

fn parse_options(pb: &mut ParseBuffer) -> PacketResult<Vec<NdpOption>> {
    let mut options = Vec::new();
    while pb.bytes_left() > 0 {
        options.push(NdpOption::parse(pb)?);
    }
    Ok(options)
}

impl Icmp6Hdr {
    pub fn size(&self) -> usize {
        ICMP6_FIXED_SIZE + self.icmp6_msg.size()
    }

    pub fn parse(pb: &mut ParseBuffer) -> PacketResult<Headers> {
        let icmp6_type = pb.get_u8()?;
        let icmp6_code = pb.get_u8()?;
        let _cksum = pb.get_u16()?;

        let icmp6_msg = match icmp6_type {
            ICMP6_ECHO_REQUEST | ICMP6_ECHO_REPLY => Icmp6Msg::Echo {
                icmp6_id: pb.get_u16()?,
                icmp6_seq: pb.get_u16()?,
            },
            ICMP6_NEIGHBOR_SOLICIT => {
                let _reserved = pb.get_u32()?;
                Icmp6Msg::NeighborSolicit {
                    ns_target: pb.get_ipv6()?,
                    ns_options: parse_options(pb)?,
                }
            }
            ICMP6_NEIGHBOR_ADVERT => {
                let flags_reserved = pb.get_u32()?;
                Icmp6Msg::NeighborAdvert {
                    na_flags: (flags_reserved >> 24) as u8 & 0xe0,
                    na_target: pb.get_ipv6()?,
                    na_options: parse_options(pb)?,
                }
            }
            _ => Icmp6Msg::Other(pb.get_bytes(pb.bytes_left())?),
        };

        let mut hdrs = Headers::new();
        hdrs.icmp6_hdr = Some(Icmp6Hdr {
            icmp6_type,
            icmp6_code,
            icmp6_msg,
        });
        Ok(hdrs)
    }

    pub fn deparse(pkt: &Packet, trailing: usize) -> PacketResult<BytesMut> {
        let hdr = pkt
            .hdrs
            .icmp6_hdr
            .as_ref()
            .ok_or_else(|| construct_error("no ICMPv6 header"))?;

        let mut v = Ipv6Hdr::deparse(pkt, hdr.size() + trailing)?;

        let mut own = Vec::with_capacity(hdr.size());
        own.push(hdr.icmp6_type);
        own.push(hdr.icmp6_code);
        own.extend_from_slice(&[0, 0]); // checksum placeholder
        match &hdr.icmp6_msg {
            Icmp6Msg::Echo {
                icmp6_id,
                icmp6_seq,
            } => {
                own.extend_from_slice(&icmp6_id.to_be_bytes());
                own.extend_from_slice(&icmp6_seq.to_be_bytes());
            }
            Icmp6Msg::NeighborSolicit {
                ns_target,
                ns_options,
            } => {
                own.extend_from_slice(&[0; 4]);
                own.extend_from_slice(&ns_target.octets());
                for opt in ns_options {
                    opt.deparse_into(&mut own);
                }
            }
            Icmp6Msg::NeighborAdvert {
                na_flags,
                na_target,
                na_options,
            } => {
                own.extend_from_slice(&[na_flags & 0xe0, 0, 0, 0]);
                own.extend_from_slice(&na_target.octets());
                for opt in na_options {
                    opt.deparse_into(&mut own);
                }
            }
            Icmp6Msg::Other(data) => own.extend_from_slice(data),
        }

        let body: &[u8] = pkt.body.as_deref().unwrap_or(&[]);
        let v6 = pkt.hdrs.ipv6_hdr.as_ref().unwrap();
        let cksum =
            Ipv6Hdr::pseudo_checksum(v6, ipv6::IPPROTO_ICMPV6, &[&own, body]);
        own[2..4].copy_from_slice(&cksum);

        v.put_slice(&own);
        Ok(v)
    }

    pub(crate) fn gen(
        mut protos: Vec<u16>,
        body: Option<&[u8]>,
    ) -> PacketResult<Packet> {
        // an optional leading stack element selects the type/code; the
        // default is an echo request
        let (icmp6_type, icmp6_code) = match protos.pop() {
            Some(tc) => ((tc >> 8) as u8, (tc & 0xff) as u8),
            None => (ICMP6_ECHO_REQUEST, 0),
        };
        let icmp6_msg = match icmp6_type {
            ICMP6_ECHO_REQUEST | ICMP6_ECHO_REPLY => Icmp6Msg::Echo {
                icmp6_id: 0,
                icmp6_seq: 0,
            },
            _ => Icmp6Msg::Other(Vec::new()),
        };

        let mut pkt = Packet::new(body);
        pkt.hdrs.icmp6_hdr = Some(Icmp6Hdr {
            icmp6_type,
            icmp6_code,
            icmp6_msg,
        });
        Ok(pkt)
    }
}

/// Build a complete Neighbor Solicitation for `target`, addressed to the
/// solicited-node multicast group as a host performing address resolution
/// would send it.
pub fn gen_neighbor_solicit(
    src_mac: MacAddr,
    src_ip: Ipv6Addr,
    target: Ipv6Addr,
) -> Packet {
    let dst_ip = solicited_node_addr(target);
    let dst_mac = multicast_mac_addr(dst_ip);

    let mut pkt = Packet::new(None);
    pkt.hdrs.icmp6_hdr = Some(Icmp6Hdr {
        icmp6_type: ICMP6_NEIGHBOR_SOLICIT,
        icmp6_code: 0,
        icmp6_msg: Icmp6Msg::NeighborSolicit {
            ns_target: target,
            ns_options: vec![NdpOption::SourceLinkLayer(src_mac)],
        },
    });
    pkt.hdrs.ipv6_hdr = Some(Ipv6Hdr {
        v6_class: 0,
        v6_flow: 0,
        v6_next_hdr: ipv6::IPPROTO_ICMPV6,
        v6_hop_limit: 255,
        v6_src: src_ip,
        v6_dst: dst_ip,
    });
    pkt.hdrs.eth_hdr = Some(EthHdr {
        eth_dmac: dst_mac,
        eth_smac: src_mac,
        eth_8021q: None,
        eth_type: eth::ETHER_IPV6,
    });
    pkt
}

/// Build a complete solicited Neighbor Advertisement, as a router answering
/// for `target` would send it to the solicitor.
pub fn gen_neighbor_advert(
    target: Ipv6Addr,
    target_mac: MacAddr,
    dst_mac: MacAddr,
    dst_ip: Ipv6Addr,
) -> Packet {
    let mut pkt = Packet::new(None);
    pkt.hdrs.icmp6_hdr = Some(Icmp6Hdr {
        icmp6_type: ICMP6_NEIGHBOR_ADVERT,
        icmp6_code: 0,
        icmp6_msg: Icmp6Msg::NeighborAdvert {
            na_flags: NA_FLAG_ROUTER | NA_FLAG_SOLICITED | NA_FLAG_OVERRIDE,
            na_target: target,
            na_options: vec![NdpOption::TargetLinkLayer(target_mac)],
        },
    });
    pkt.hdrs.ipv6_hdr = Some(Ipv6Hdr {
        v6_class: 0,
        v6_flow: 0,
        v6_next_hdr: ipv6::IPPROTO_ICMPV6,
        v6_hop_limit: 255,
        v6_src: target,
        v6_dst: dst_ip,
    });
    pkt.hdrs.eth_hdr = Some(EthHdr {
        eth_dmac: dst_mac,
        eth_smac: target_mac,
        eth_8021q: None,
        eth_type: eth::ETHER_IPV6,
    });
    pkt
}

impl fmt::Display for Icmp6Hdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.icmp6_msg {
            Icmp6Msg::Echo { icmp6_id, icmp6_seq } => write!(
                f,
                "icmp6 type {} id {} seq {}",
                self.icmp6_type, icmp6_id, icmp6_seq
            ),
            Icmp6Msg::NeighborSolicit { ns_target, .. } => {
                write!(f, "icmp6 neighbor solicit for {ns_target}")
            }
            Icmp6Msg::NeighborAdvert {
                na_flags,
                na_target,
                ..
            } => write!(
                f,
                "icmp6 neighbor advert for {na_target} flags {na_flags:#x}"
            ),
            Icmp6Msg::Other(data) => write!(
                f,
                "icmp6 type {} code {} ({} bytes)",
                self.icmp6_type,
                self.icmp6_code,
                data.len()
            ),
        }
    }
}
