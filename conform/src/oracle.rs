// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Pure transformations deriving the expected output packet from an input
//! packet.  Each function mirrors one documented behavior of the pipeline
//! under test; every expectation in the suite is computed here from the
//! packet actually sent, never constructed independently.

use common::MacAddr;
use packet::eth::EthHdr;
use packet::icmp6::{self, Icmp6Msg, ICMP6_NEIGHBOR_SOLICIT};
use packet::ipv6::Ipv6Hdr;
use packet::{Packet, PacketError};

use crate::{HarnessError, HarnessResult};

fn malformed(msg: &str) -> HarnessError {
    HarnessError::Packet(PacketError::Construct(msg.to_string()))
}

/// The routing transformation: the destination MAC becomes `next_hop`, the
/// source MAC becomes the station MAC the packet was addressed to, and the
/// hop limit drops by one.  Everything else is untouched.
pub fn routed(pkt: &Packet, next_hop: MacAddr) -> HarnessResult<Packet> {
    let station = pkt
        .hdrs
        .eth_hdr
        .as_ref()
        .ok_or_else(|| malformed("packet has no ethernet header"))?
        .eth_dmac;
    if pkt.hdrs.ipv6_hdr.is_none() {
        return Err(malformed("packet has no IPv6 header"));
    }

    let mut out = pkt.clone();
    EthHdr::rewrite_smac(&mut out, station);
    EthHdr::rewrite_dmac(&mut out, next_hop);
    Ipv6Hdr::adjust_hlim(&mut out, -1);
    Ok(out)
}

/// The NDP transformation: the Advertisement answering a Neighbor
/// Solicitation.  Source and destination addresses are swapped relative to
/// the solicitation (the target address becomes the source), and the
/// advertised target MAC is the router's.
pub fn ndp_advertisement(
    ns: &Packet,
    router_mac: MacAddr,
) -> HarnessResult<Packet> {
    let hdr = ns
        .hdrs
        .icmp6_hdr
        .as_ref()
        .filter(|h| h.icmp6_type == ICMP6_NEIGHBOR_SOLICIT)
        .ok_or_else(|| malformed("packet is not a neighbor solicitation"))?;
    let Icmp6Msg::NeighborSolicit { ns_target, .. } = &hdr.icmp6_msg else {
        return Err(malformed("malformed neighbor solicitation"));
    };
    let eth = ns
        .hdrs
        .eth_hdr
        .as_ref()
        .ok_or_else(|| malformed("packet has no ethernet header"))?;
    let v6 = ns
        .hdrs
        .ipv6_hdr
        .as_ref()
        .ok_or_else(|| malformed("packet has no IPv6 header"))?;

    Ok(icmp6::gen_neighbor_advert(
        *ns_target,
        router_mac,
        eth.eth_smac,
        v6.v6_src,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use packet::icmp6::{NdpOption, NA_FLAG_OVERRIDE};
    use packet::icmp6::{NA_FLAG_ROUTER, NA_FLAG_SOLICITED};
    use packet::{eth, ipv6, Endpoint};
    use std::net::Ipv6Addr;

    fn endpoints() -> (Endpoint, Endpoint) {
        (
            Endpoint::parse("e0:d5:5e:67:89:ab", "fd00:1122:7788:0101::4", 3333)
                .unwrap(),
            Endpoint::parse("e0:d5:5e:67:89:ac", "fd00:1122:3344:0101::5", 4444)
                .unwrap(),
        )
    }

    #[test]
    fn test_routed_rewrites() {
        let (src, dst) = endpoints();
        let pkt = Packet::gen(
            src,
            dst,
            vec![ipv6::IPPROTO_UDP.into(), eth::ETHER_IPV6],
            Some(b"data"),
        )
        .unwrap();
        let next_hop: MacAddr = "02:78:39:45:b9:01".parse().unwrap();

        let out = routed(&pkt, next_hop).unwrap();

        let eth_in = pkt.hdrs.eth_hdr.as_ref().unwrap();
        let eth_out = out.hdrs.eth_hdr.as_ref().unwrap();
        assert_eq!(eth_out.eth_dmac, next_hop);
        assert_eq!(eth_out.eth_smac, eth_in.eth_dmac);

        let v6_in = pkt.hdrs.ipv6_hdr.as_ref().unwrap();
        let v6_out = out.hdrs.ipv6_hdr.as_ref().unwrap();
        assert_eq!(v6_out.v6_hop_limit, v6_in.v6_hop_limit - 1);

        // nothing else moves
        assert_eq!(v6_out.v6_src, v6_in.v6_src);
        assert_eq!(v6_out.v6_dst, v6_in.v6_dst);
        assert_eq!(out.hdrs.udp_hdr, pkt.hdrs.udp_hdr);
        assert_eq!(out.body, pkt.body);
    }

    #[test]
    fn test_routed_requires_ipv6() {
        let err = routed(&Packet::new(None), MacAddr::ZERO);
        assert!(err.is_err());
    }

    #[test]
    fn test_ndp_advertisement_swaps() {
        let host_mac: MacAddr = "e0:d5:5e:67:89:ab".parse().unwrap();
        let host_ip: Ipv6Addr = "2001:0:1::10".parse().unwrap();
        let target: Ipv6Addr = "2001:0:1::1".parse().unwrap();
        let router_mac: MacAddr = "00:aa:00:00:00:01".parse().unwrap();

        let ns = icmp6::gen_neighbor_solicit(host_mac, host_ip, target);
        let na = ndp_advertisement(&ns, router_mac).unwrap();

        let eth = na.hdrs.eth_hdr.as_ref().unwrap();
        assert_eq!(eth.eth_smac, router_mac);
        assert_eq!(eth.eth_dmac, host_mac);

        let v6 = na.hdrs.ipv6_hdr.as_ref().unwrap();
        assert_eq!(v6.v6_src, target);
        assert_eq!(v6.v6_dst, host_ip);

        let hdr = na.hdrs.icmp6_hdr.as_ref().unwrap();
        match &hdr.icmp6_msg {
            Icmp6Msg::NeighborAdvert {
                na_flags,
                na_target,
                na_options,
            } => {
                assert_eq!(
                    *na_flags,
                    NA_FLAG_ROUTER | NA_FLAG_SOLICITED | NA_FLAG_OVERRIDE
                );
                assert_eq!(*na_target, target);
                assert_eq!(
                    na_options,
                    &vec![NdpOption::TargetLinkLayer(router_mac)]
                );
            }
            x => panic!("expected neighbor advert, got {x:?}"),
        }
    }

    #[test]
    fn test_ndp_advertisement_rejects_non_ns() {
        let (src, dst) = endpoints();
        let pkt = Packet::gen(
            src,
            dst,
            vec![ipv6::IPPROTO_ICMPV6.into(), eth::ETHER_IPV6],
            None,
        )
        .unwrap();
        assert!(ndp_advertisement(&pkt, MacAddr::ZERO).is_err());
    }
}
