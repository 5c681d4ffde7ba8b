// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Typed wrappers over the fabric pipeline's tables.  Scenarios go through
//! these instead of spelling out field and action names, so a malformed
//! request is impossible to write and the table layout lives in one place.

/// The station table: frames whose destination MAC matches an entry are
/// candidates for routing.
pub mod my_station {
    use common::MacAddr;
    use fabric::profile;
    use mat::{ActionData, EntryRequest, PipelineOps};

    use crate::{HarnessResult, ProgramScope};

    pub fn add<P: PipelineOps>(
        scope: &mut ProgramScope<P>,
        mac: MacAddr,
    ) -> HarnessResult<()> {
        scope.insert(
            EntryRequest::table(profile::MY_STATION_TABLE)
                .match_exact("dst_mac", mac)
                .action(ActionData::new(profile::ACT_NO_ACTION))
                .build()?,
        )
    }
}

/// The IPv6 routing table, longest prefix first.
pub mod route_v6 {
    use common::MacAddr;
    use fabric::profile;
    use mat::{ActionData, EntryRequest, PipelineOps};
    use oxnet::Ipv6Net;

    use crate::{HarnessResult, ProgramScope};

    /// Route `cidr` through an ECMP group.
    pub fn add_via_group<P: PipelineOps>(
        scope: &mut ProgramScope<P>,
        cidr: Ipv6Net,
        group_id: u16,
    ) -> HarnessResult<()> {
        scope.insert(
            EntryRequest::table(profile::ROUTE_V6_TABLE)
                .match_lpm("dst_addr", cidr)
                .group(group_id)
                .build()?,
        )
    }

    /// Route `cidr` straight to a next-hop MAC, no group indirection.
    pub fn add_via_nexthop<P: PipelineOps>(
        scope: &mut ProgramScope<P>,
        cidr: Ipv6Net,
        nexthop: MacAddr,
    ) -> HarnessResult<()> {
        scope.insert(
            EntryRequest::table(profile::ROUTE_V6_TABLE)
                .match_lpm("dst_addr", cidr)
                .action(
                    ActionData::new(profile::ACT_SET_NEXT_HOP)
                        .with_arg("dmac", nexthop),
                )
                .build()?,
        )
    }
}

/// ECMP groups referenced by route entries.
pub mod ecmp {
    use common::MacAddr;
    use fabric::profile;
    use mat::{ActionData, GroupRequest, PipelineOps};

    use crate::{HarnessResult, ProgramScope};

    /// Create a group with one equal-weight member per next-hop MAC.
    pub fn add_group<P: PipelineOps>(
        scope: &mut ProgramScope<P>,
        group_id: u16,
        nexthops: &[MacAddr],
    ) -> HarnessResult<()> {
        let mut group = GroupRequest::profile(profile::ECMP_SELECTOR, group_id);
        for nexthop in nexthops {
            group = group.member(
                ActionData::new(profile::ACT_SET_NEXT_HOP)
                    .with_arg("dmac", *nexthop),
            );
        }
        scope.insert_group(group.build()?)
    }
}

/// The L2 forwarding table mapping a next-hop MAC to its egress port.
pub mod l2_exact {
    use common::MacAddr;
    use fabric::profile;
    use mat::{ActionData, EntryRequest, PipelineOps};

    use crate::{HarnessResult, ProgramScope};

    pub fn add<P: PipelineOps>(
        scope: &mut ProgramScope<P>,
        mac: MacAddr,
        port: u16,
    ) -> HarnessResult<()> {
        scope.insert(
            EntryRequest::table(profile::L2_EXACT_TABLE)
                .match_exact("dst_mac", mac)
                .action(
                    ActionData::new(profile::ACT_SET_OUTPUT_PORT)
                        .with_arg("port", port),
                )
                .build()?,
        )
    }
}

/// The NDP reply table: Neighbor Solicitations for a target address are
/// answered with an Advertisement carrying the configured router MAC.
pub mod ndp_reply {
    use std::net::Ipv6Addr;

    use common::MacAddr;
    use fabric::profile;
    use mat::{ActionData, EntryRequest, PipelineOps};

    use crate::{HarnessResult, ProgramScope};

    pub fn add<P: PipelineOps>(
        scope: &mut ProgramScope<P>,
        target: Ipv6Addr,
        router_mac: MacAddr,
    ) -> HarnessResult<()> {
        scope.insert(
            EntryRequest::table(profile::NDP_REPLY_TABLE)
                .match_exact("target_addr", target)
                .action(
                    ActionData::new(profile::ACT_NDP_ADVERTISEMENT)
                        .with_arg("router_mac", router_mac),
                )
                .build()?,
        )
    }
}
