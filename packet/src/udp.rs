// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::construct_error;
use crate::ipv6;
use crate::pbuf::ParseBuffer;
use crate::{Endpoint, Headers, Packet, PacketResult};

pub const UDP_HDR_SIZE: usize = 8;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UdpHdr {
    pub udp_sport: u16,
    pub udp_dport: u16,
}

impl UdpHdr {
    pub fn parse(pb: &mut ParseBuffer) -> PacketResult<Headers> {
        let udp_sport = pb.get_u16()?;
        let udp_dport = pb.get_u16()?;
        let _len = pb.get_u16()?;
        let _cksum = pb.get_u16()?;

        let mut hdrs = Headers::new();
        hdrs.udp_hdr = Some(UdpHdr {
            udp_sport,
            udp_dport,
        });
        Ok(hdrs)
    }

    pub fn deparse(pkt: &Packet, trailing: usize) -> PacketResult<BytesMut> {
        let hdr = pkt
            .hdrs
            .udp_hdr
            .as_ref()
            .ok_or_else(|| construct_error("no UDP header"))?;

        let mut v = ipv6::Ipv6Hdr::deparse(pkt, UDP_HDR_SIZE + trailing)?;

        let mut own = Vec::with_capacity(UDP_HDR_SIZE);
        own.extend_from_slice(&hdr.udp_sport.to_be_bytes());
        own.extend_from_slice(&hdr.udp_dport.to_be_bytes());
        own.extend_from_slice(
            &((UDP_HDR_SIZE + trailing) as u16).to_be_bytes(),
        );
        own.extend_from_slice(&[0, 0]); // checksum placeholder

        let body: &[u8] = pkt.body.as_deref().unwrap_or(&[]);
        let v6 = pkt.hdrs.ipv6_hdr.as_ref().unwrap();
        let mut cksum =
            ipv6::Ipv6Hdr::pseudo_checksum(v6, ipv6::IPPROTO_UDP, &[&own, body]);
        // a computed zero is transmitted as all-ones (RFC 768)
        if cksum == [0, 0] {
            cksum = [0xff, 0xff];
        }
        own[6..8].copy_from_slice(&cksum);

        v.put_slice(&own);
        Ok(v)
    }

    pub(crate) fn gen(
        src: Endpoint,
        dst: Endpoint,
        body: Option<&[u8]>,
    ) -> PacketResult<Packet> {
        let mut pkt = Packet::new(body);
        pkt.hdrs.udp_hdr = Some(UdpHdr {
            udp_sport: src.port,
            udp_dport: dst.port,
        });
        Ok(pkt)
    }
}

impl fmt::Display for UdpHdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "udp {} -> {}", self.udp_sport, self.udp_dport)
    }
}
