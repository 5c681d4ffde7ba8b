// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::ipv6;
use crate::pbuf::ParseBuffer;
use crate::{construct_error, MacAddr};
use crate::{Headers, Packet, PacketResult};

pub const ETHER_8021Q: u16 = 0x8100;
pub const ETHER_IPV6: u16 = 0x86dd;

pub const ETHER_HDR_SIZE: usize = 14;

/// An 802.1Q tag, present when the untagged ethertype is ETHER_8021Q.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EthQHdr {
    pub eth_pcp: u8,  // 3 bits
    pub eth_dei: u8,  // 1 bit
    pub eth_vlan_tag: u16, // 12 bits
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EthHdr {
    pub eth_dmac: MacAddr,
    pub eth_smac: MacAddr,
    pub eth_8021q: Option<EthQHdr>,
    pub eth_type: u16,
}

impl EthHdr {
    pub fn size(&self) -> usize {
        match self.eth_8021q {
            Some(_) => ETHER_HDR_SIZE + 4,
            None => ETHER_HDR_SIZE,
        }
    }

    pub fn rewrite_dmac(pkt: &mut Packet, mac: MacAddr) {
        if let Some(hdr) = pkt.hdrs.eth_hdr.as_mut() {
            hdr.eth_dmac = mac;
        }
    }

    pub fn rewrite_smac(pkt: &mut Packet, mac: MacAddr) {
        if let Some(hdr) = pkt.hdrs.eth_hdr.as_mut() {
            hdr.eth_smac = mac;
        }
    }

    pub fn parse(pb: &mut ParseBuffer) -> PacketResult<Headers> {
        let eth_dmac = pb.get_mac()?;
        let eth_smac = pb.get_mac()?;
        let mut eth_type = pb.get_u16()?;

        let eth_8021q = if eth_type == ETHER_8021Q {
            let x = pb.get_u16()?;
            eth_type = pb.get_u16()?;
            Some(EthQHdr {
                eth_pcp: (x >> 13) as u8,
                eth_dei: ((x >> 12) & 1) as u8,
                eth_vlan_tag: x & 0xfff,
            })
        } else {
            None
        };

        let mut hdrs = match eth_type {
            ETHER_IPV6 => ipv6::Ipv6Hdr::parse(pb)?,
            _ => Headers::new(),
        };
        hdrs.eth_hdr = Some(EthHdr {
            eth_dmac,
            eth_smac,
            eth_8021q,
            eth_type,
        });
        Ok(hdrs)
    }

    pub fn deparse(pkt: &Packet, trailing: usize) -> PacketResult<BytesMut> {
        let hdr = pkt
            .hdrs
            .eth_hdr
            .as_ref()
            .ok_or_else(|| construct_error("no ethernet header"))?;

        let mut v = BytesMut::with_capacity(hdr.size() + trailing);
        v.put_slice(&hdr.eth_dmac.to_vec());
        v.put_slice(&hdr.eth_smac.to_vec());
        if let Some(q) = &hdr.eth_8021q {
            v.put_u16(ETHER_8021Q);
            v.put_u16(
                ((q.eth_pcp as u16) << 13)
                    | ((q.eth_dei as u16) << 12)
                    | (q.eth_vlan_tag & 0xfff),
            );
        }
        v.put_u16(hdr.eth_type);
        Ok(v)
    }
}

impl fmt::Display for EthHdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eth {} -> {}", self.eth_smac, self.eth_dmac)?;
        if let Some(q) = &self.eth_8021q {
            write!(f, " vlan {}", q.eth_vlan_tag)?;
        }
        Ok(())
    }
}
